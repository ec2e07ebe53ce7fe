use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::json::reader::{ReaderBuilder, infer_json_schema_from_iterator};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use common::{Error, Result};
use serde_json::{Map, Value};
use std::io::Cursor;
use std::sync::Arc;

/// Parses a JSON array of objects, as served by the dataset endpoint.
pub fn parse_records(body: &[u8]) -> Result<Vec<Map<String, Value>>> {
    let values: Vec<Value> = serde_json::from_slice(body)?;

    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidInput(format!(
                "Record {} is not a JSON object: {}",
                idx, other
            ))),
        })
        .collect()
}

/// Builds a raw batch with one nullable `Utf8` column per field seen in any
/// record, ordered by first appearance. Scalars keep their textual form,
/// nested arrays and objects are kept as JSON text, absent keys and JSON
/// nulls become nulls.
pub fn records_to_batch(records: &[Map<String, Value>]) -> Result<RecordBatch> {
    let rows: Vec<Value> = records
        .iter()
        .map(|record| Value::Object(record.iter().map(|(k, v)| (k.clone(), flatten(v))).collect()))
        .collect();

    let inferred = infer_json_schema_from_iterator(rows.iter().cloned().map(Ok))?;
    let schema: SchemaRef = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<Field>>(),
    ));

    if schema.fields().is_empty() {
        let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
        return Ok(RecordBatch::try_new_with_options(schema, vec![], &options)?);
    }

    let mut lines = Vec::new();
    for row in &rows {
        serde_json::to_writer(&mut lines, row)?;
        lines.push(b'\n');
    }

    let reader = ReaderBuilder::new(schema.clone())
        .with_coerce_primitive(true)
        .build(Cursor::new(lines))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(concat_batches(&schema, &batches)?)
}

/// Nested values are not decoded into columns; they travel as their JSON text.
fn flatten(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        scalar => scalar.clone(),
    }
}
