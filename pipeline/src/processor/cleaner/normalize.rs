//! Categorical default-fill and string normalization.

use crate::utils::arrow::string_values;
use arrow::array::{ArrayRef, StringArray};
use common::Result;

/// Reads a categorical column as owned strings; an absent column is all
/// missing.
pub fn categorical_values(column: Option<&ArrayRef>, len: usize) -> Result<Vec<Option<String>>> {
    match column {
        Some(column) => string_values(column),
        None => Ok(vec![None; len]),
    }
}

/// Replaces missing cells with `default`, returning how many were filled.
pub fn fill_missing(values: &mut [Option<String>], default: &str) -> usize {
    let mut filled = 0;
    for value in values.iter_mut().filter(|v| v.is_none()) {
        *value = Some(default.to_string());
        filled += 1;
    }
    filled
}

pub fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Lowercases and trims every present cell.
pub fn normalize(values: Vec<Option<String>>) -> StringArray {
    values
        .into_iter()
        .map(|v| v.map(|s| normalize_text(&s)))
        .collect()
}
