//! Numeric coercion and median imputation.

use crate::utils::arrow::string_values;
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use common::Result;

/// Result of coercing one cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Number(f64),
    Missing(MissingReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// No value was present.
    Absent,
    /// A value was present but is not a finite number.
    Malformed,
}

impl Coerced {
    pub fn number(&self) -> Option<f64> {
        match self {
            Coerced::Number(n) => Some(*n),
            Coerced::Missing(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Coerced::Missing(MissingReason::Malformed))
    }
}

/// Median of the present values, or `Degenerate` when there are none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Median {
    Value(f64),
    Degenerate,
}

impl Median {
    pub fn or_zero(self) -> f64 {
        match self {
            Median::Value(v) => v,
            Median::Degenerate => 0.0,
        }
    }
}

/// Parses a trimmed decimal or scientific literal. Non-finite results count
/// as unparsable.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn coerce_text(value: Option<String>) -> Coerced {
    match value {
        None => Coerced::Missing(MissingReason::Absent),
        Some(text) => match parse_numeric(&text) {
            Some(n) => Coerced::Number(n),
            None => Coerced::Missing(MissingReason::Malformed),
        },
    }
}

/// Coerces a column of any type into numbers. An absent column is treated as
/// `len` missing cells.
pub fn coerce_column(column: Option<&ArrayRef>, len: usize) -> Result<Vec<Coerced>> {
    let Some(column) = column else {
        return Ok(vec![Coerced::Missing(MissingReason::Absent); len]);
    };

    if column.data_type().is_numeric() {
        let as_float = cast(column, &DataType::Float64)?;
        let floats = as_float
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| common::Error::Other("Failed to downcast to Float64Array".to_string()))?;

        return Ok(floats
            .iter()
            .map(|v| match v {
                None => Coerced::Missing(MissingReason::Absent),
                Some(n) if n.is_finite() => Coerced::Number(n),
                Some(_) => Coerced::Missing(MissingReason::Malformed),
            })
            .collect());
    }

    Ok(string_values(column)?.into_iter().map(coerce_text).collect())
}

/// Median over the present values; the mean of the two middle values for an
/// even count.
pub fn median(values: &[Coerced]) -> Median {
    let mut present: Vec<f64> = values.iter().filter_map(Coerced::number).collect();
    if present.is_empty() {
        return Median::Degenerate;
    }

    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Median::Value(present[mid - 1] / 2.0 + present[mid] / 2.0)
    } else {
        Median::Value(present[mid])
    }
}

/// Replaces every missing cell with `fill`.
pub fn impute(values: &[Coerced], fill: f64) -> Float64Array {
    values
        .iter()
        .map(|v| Some(v.number().unwrap_or(fill)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use std::sync::Arc;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("10"), Some(10.0));
        assert_eq!(parse_numeric("  -4.5 "), Some(-4.5));
        assert_eq!(parse_numeric("1e3"), Some(1000.0));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("bad"), None);
        assert_eq!(parse_numeric("1,234"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn test_coerce_text_column_distinguishes_absent_and_malformed() {
        let column: ArrayRef = Arc::new(StringArray::from(vec![Some("10"), Some("bad"), None]));
        let coerced = coerce_column(Some(&column), 3).unwrap();

        assert_eq!(
            coerced,
            vec![
                Coerced::Number(10.0),
                Coerced::Missing(MissingReason::Malformed),
                Coerced::Missing(MissingReason::Absent),
            ]
        );
        assert!(coerced[1].is_malformed());
    }

    #[test]
    fn test_coerce_numeric_column() {
        let column: ArrayRef = Arc::new(Int64Array::from(vec![Some(3), None]));
        let coerced = coerce_column(Some(&column), 2).unwrap();
        assert_eq!(
            coerced,
            vec![Coerced::Number(3.0), Coerced::Missing(MissingReason::Absent)]
        );
    }

    #[test]
    fn test_absent_column_is_all_missing() {
        let coerced = coerce_column(None, 2).unwrap();
        assert_eq!(coerced, vec![Coerced::Missing(MissingReason::Absent); 2]);
    }

    #[test]
    fn test_median_odd_and_even() {
        let odd = [Coerced::Number(3.0), Coerced::Number(1.0), Coerced::Number(2.0)];
        assert_eq!(median(&odd), Median::Value(2.0));

        let even = [
            Coerced::Number(4.0),
            Coerced::Missing(MissingReason::Malformed),
            Coerced::Number(1.0),
            Coerced::Number(3.0),
            Coerced::Number(2.0),
        ];
        assert_eq!(median(&even), Median::Value(2.5));
    }

    #[test]
    fn test_median_of_huge_values_stays_finite() {
        let values = [Coerced::Number(f64::MAX), Coerced::Number(f64::MAX)];
        assert_eq!(median(&values), Median::Value(f64::MAX));
    }

    #[test]
    fn test_median_of_nothing_is_degenerate_and_falls_back_to_zero() {
        let values = [Coerced::Missing(MissingReason::Absent); 3];
        assert_eq!(median(&values), Median::Degenerate);
        assert_eq!(median(&values).or_zero(), 0.0);
        assert_eq!(median(&[]), Median::Degenerate);
    }

    #[test]
    fn test_impute_fills_only_missing() {
        let values = [Coerced::Number(5.0), Coerced::Missing(MissingReason::Absent)];
        let filled = impute(&values, 7.0);
        assert_eq!(filled.values().to_vec(), vec![5.0, 7.0]);
        assert_eq!(filled.null_count(), 0);
    }
}
