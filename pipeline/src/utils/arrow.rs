use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use serde_json::{Number, Value};

/// Looks up a column, failing with the column name when it is absent.
pub fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::SchemaMismatch(format!("Column '{}' not found", name)))
}

pub fn float64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    let column = required_column(batch, name)?;
    column
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            Error::SchemaMismatch(format!(
                "Column '{}' is {:?}, expected Float64",
                name,
                column.data_type()
            ))
        })
}

pub fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let column = required_column(batch, name)?;
    column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            Error::SchemaMismatch(format!(
                "Column '{}' is {:?}, expected Utf8",
                name,
                column.data_type()
            ))
        })
}

pub fn date32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Date32Array> {
    let column = required_column(batch, name)?;
    column
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| {
            Error::SchemaMismatch(format!(
                "Column '{}' is {:?}, expected Date32",
                name,
                column.data_type()
            ))
        })
}

/// Renders any column as optional strings, nulls preserved.
pub fn string_values(column: &ArrayRef) -> Result<Vec<Option<String>>> {
    let as_text = cast(column, &DataType::Utf8)?;
    let strings = as_text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other("Failed to downcast cast result to StringArray".to_string()))?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

pub fn batch_to_json(batch: &RecordBatch, limit: usize) -> Result<Vec<Value>> {
    let mut json_rows = Vec::new();

    for row_idx in 0..batch.num_rows().min(limit) {
        let mut row = serde_json::Map::new();

        for (col_idx, field) in batch.schema().fields().iter().enumerate() {
            let column = batch.column(col_idx);
            let value = arrow_array_to_json(column, row_idx)?;
            row.insert(field.name().clone(), value);
        }

        json_rows.push(Value::Object(row));
    }

    Ok(json_rows)
}

pub fn arrow_array_to_json(array: &dyn Array, index: usize) -> Result<Value> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    let mismatch = || Error::Other(format!("Array does not match {:?}", array.data_type()));

    Ok(match array.data_type() {
        DataType::Int32 => {
            let array = array.as_any().downcast_ref::<Int32Array>().ok_or_else(mismatch)?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::Int64 => {
            let array = array.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::UInt32 => {
            let array = array.as_any().downcast_ref::<UInt32Array>().ok_or_else(mismatch)?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::UInt64 => {
            let array = array.as_any().downcast_ref::<UInt64Array>().ok_or_else(mismatch)?;
            Value::Number(Number::from(array.value(index)))
        }
        DataType::Float64 => {
            let array = array.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
            Number::from_f64(array.value(index))
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        DataType::Utf8 => {
            let array = array.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?;
            Value::String(array.value(index).to_string())
        }
        DataType::Date32 => {
            let array = array.as_any().downcast_ref::<Date32Array>().ok_or_else(mismatch)?;
            Date32Type::to_naive_date(array.value(index))
                .format("%Y-%m-%d")
                .to_string()
                .into()
        }
        _ => Value::Null,
    })
}
