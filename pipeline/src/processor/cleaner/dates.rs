//! Date parsing for `as_of_date`.

use crate::utils::arrow::string_values;
use arrow::array::{Array, ArrayRef, Date32Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::Result;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Parses the date part of a date or datetime string. Returns `None` when no
/// known format matches.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// Converts a column to `Date32`. Unparsable cells become null; the second
/// value counts them (cells that were already null are not counted).
pub fn coerce_dates(column: Option<&ArrayRef>, len: usize) -> Result<(Date32Array, usize)> {
    let Some(column) = column else {
        return Ok((Date32Array::from(vec![None::<i32>; len]), 0));
    };

    match column.data_type() {
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let dates = cast(column, &DataType::Date32)?;
            let dates = dates
                .as_any()
                .downcast_ref::<Date32Array>()
                .ok_or_else(|| common::Error::Other("Failed to downcast to Date32Array".to_string()))?
                .clone();
            Ok((dates, 0))
        }
        _ => {
            let mut unparsable = 0;
            let dates: Date32Array = string_values(column)?
                .into_iter()
                .map(|value| {
                    let value = value?;
                    let parsed = parse_date(&value).map(Date32Type::from_naive_date);
                    if parsed.is_none() {
                        unparsable += 1;
                    }
                    parsed
                })
                .collect();
            Ok((dates, unparsable))
        }
    }
}
