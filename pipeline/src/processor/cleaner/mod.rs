//! Cleaning stage: coerces, imputes, fills and normalizes the raw batch.
//!
//! Every sub-stage is total. Values that cannot be coerced become missing and
//! are imputed or left null, they never abort the stage. The only errors are
//! Arrow failures while assembling the output batch.

pub mod dates;
pub mod normalize;
pub mod numeric;

use crate::models::schema::{
    AS_OF_DATE, CITY, NORMALIZED_FIELDS, NUMERIC_FIELDS, SCHOOL_TYPE, UNKNOWN_SCHOOL_TYPE,
    cleaned_type,
};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use common::Result;
use numeric::Median;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the cleaner changed, per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows: usize,
    pub malformed: BTreeMap<String, usize>,
    pub imputed: BTreeMap<String, usize>,
    pub medians: BTreeMap<String, f64>,
    /// Numeric fields that had no usable value; imputed with 0.
    pub degenerate: Vec<String>,
    pub school_type_filled: usize,
    pub unparsable_dates: usize,
}

pub struct Cleaner;

impl Cleaner {
    pub fn clean(batch: RecordBatch) -> Result<RecordBatch> {
        Self::clean_with_report(batch).map(|(batch, _)| batch)
    }

    pub fn clean_with_report(batch: RecordBatch) -> Result<(RecordBatch, CleaningReport)> {
        let len = batch.num_rows();
        let mut report = CleaningReport {
            rows: len,
            ..Default::default()
        };

        // Numeric coercion, then median imputation over the coerced values.
        let mut numeric_columns: Vec<(&str, Float64Array)> = Vec::with_capacity(NUMERIC_FIELDS.len());
        for field in NUMERIC_FIELDS {
            let coerced = numeric::coerce_column(batch.column_by_name(field), len)?;
            let malformed = coerced.iter().filter(|v| v.is_malformed()).count();
            let missing = coerced.iter().filter(|v| v.number().is_none()).count();

            let fill = match numeric::median(&coerced) {
                Median::Value(median) => median,
                Median::Degenerate => {
                    warn!(field, rows = len, "No numeric values to compute a median, imputing 0");
                    report.degenerate.push(field.to_string());
                    Median::Degenerate.or_zero()
                }
            };

            debug!(field, malformed, imputed = missing, median = fill, "Numeric field coerced");
            report.malformed.insert(field.to_string(), malformed);
            report.imputed.insert(field.to_string(), missing);
            report.medians.insert(field.to_string(), fill);
            numeric_columns.push((field, numeric::impute(&coerced, fill)));
        }

        let mut school_types = normalize::categorical_values(batch.column_by_name(SCHOOL_TYPE), len)?;
        report.school_type_filled = normalize::fill_missing(&mut school_types, UNKNOWN_SCHOOL_TYPE);
        info!(
            imputed = ?report.imputed,
            school_type_filled = report.school_type_filled,
            "Missing values handled"
        );

        let (dates, unparsable_dates) = dates::coerce_dates(batch.column_by_name(AS_OF_DATE), len)?;
        report.unparsable_dates = unparsable_dates;
        if unparsable_dates > 0 {
            warn!(unparsable_dates, "Dates that could not be parsed were set to missing");
        }
        info!("Data types converted");

        let school_types = normalize::normalize(school_types);
        let cities = normalize::normalize(normalize::categorical_values(batch.column_by_name(CITY), len)?);
        info!("Categorical data standardized");

        let mut replacements: Vec<(&str, ArrayRef)> = numeric_columns
            .into_iter()
            .map(|(field, values)| (field, Arc::new(values) as ArrayRef))
            .collect();
        replacements.push((SCHOOL_TYPE, Arc::new(school_types) as ArrayRef));
        replacements.push((CITY, Arc::new(cities) as ArrayRef));
        replacements.push((AS_OF_DATE, Arc::new(dates) as ArrayRef));

        let cleaned = Self::rebuild(&batch, replacements)?;
        Ok((cleaned, report))
    }

    /// Swaps the cleaned columns into the batch, keeping column order and
    /// appending any cleaned field the input did not have.
    fn rebuild(batch: &RecordBatch, replacements: Vec<(&str, ArrayRef)>) -> Result<RecordBatch> {
        let mut pending: BTreeMap<&str, ArrayRef> = replacements.iter().cloned().collect();
        let mut fields = Vec::with_capacity(batch.num_columns() + replacements.len());
        let mut columns = Vec::with_capacity(batch.num_columns() + replacements.len());

        for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
            match pending.remove(field.name().as_str()) {
                Some(replacement) => {
                    fields.push(Field::new(field.name(), replacement.data_type().clone(), true));
                    columns.push(replacement);
                }
                None => {
                    fields.push(field.as_ref().clone());
                    columns.push(column.clone());
                }
            }
        }

        for (name, _) in &replacements {
            if let Some(column) = pending.remove(name) {
                fields.push(Field::new(*name, column.data_type().clone(), true));
                columns.push(column);
            }
        }

        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new_with_metadata(fields, batch.schema().metadata().clone())),
            columns,
            &options,
        )?)
    }
}

/// True when every field the cleaner owns has its cleaned type.
pub fn is_cleaned(batch: &RecordBatch) -> bool {
    let schema = batch.schema();
    NUMERIC_FIELDS
        .iter()
        .chain(NORMALIZED_FIELDS.iter())
        .chain(std::iter::once(&AS_OF_DATE))
        .all(|&name| match (schema.field_with_name(name), cleaned_type(name)) {
            (Ok(field), Some(expected)) => field.data_type() == &expected,
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{AVERAGE_DAILY_ATTENDANCE, MEAL_COUNT};
    use crate::utils::arrow::{date32_column, float64_column, utf8_column};
    use arrow::array::Array;
    use chrono::NaiveDate;
    use etl::{parse_records, records_to_batch};

    fn raw(body: &str) -> RecordBatch {
        records_to_batch(&parse_records(body.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_two_row_example() {
        let batch = raw(
            r#"[
                {"meal_count": "10", "city": " NYC ", "school_type": "Public", "as_of_date": "2024-03-01"},
                {"meal_count": "bad", "city": "nyc", "school_type": null, "as_of_date": "2024-03-15"}
            ]"#,
        );

        let (cleaned, report) = Cleaner::clean_with_report(batch).unwrap();

        let meals = float64_column(&cleaned, MEAL_COUNT).unwrap();
        assert_eq!(meals.value(0), 10.0);
        assert_eq!(meals.value(1), 10.0);

        let school = utf8_column(&cleaned, SCHOOL_TYPE).unwrap();
        assert_eq!(school.value(0), "public");
        assert_eq!(school.value(1), "desconhecido");

        let city = utf8_column(&cleaned, CITY).unwrap();
        assert_eq!(city.value(0), "nyc");
        assert_eq!(city.value(1), "nyc");

        let dates = date32_column(&cleaned, AS_OF_DATE).unwrap();
        assert_eq!(dates.value_as_date(1), NaiveDate::from_ymd_opt(2024, 3, 15));

        assert_eq!(report.malformed[MEAL_COUNT], 1);
        assert_eq!(report.imputed[MEAL_COUNT], 1);
        assert_eq!(report.school_type_filled, 1);
        assert_eq!(report.degenerate, vec![AVERAGE_DAILY_ATTENDANCE.to_string()]);
    }

    #[test]
    fn test_all_missing_numeric_column_imputes_zero() {
        let batch = raw(r#"[{"average_daily_attendance": "n/a"}, {"average_daily_attendance": null}]"#);
        let cleaned = Cleaner::clean(batch).unwrap();

        let attendance = float64_column(&cleaned, AVERAGE_DAILY_ATTENDANCE).unwrap();
        assert_eq!(attendance.values().to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_median_uses_all_present_values() {
        let batch = raw(
            r#"[{"meal_count": "1"}, {"meal_count": "9"}, {"meal_count": "4"}, {"meal_count": "x"}, {"meal_count": "6"}]"#,
        );
        let cleaned = Cleaner::clean(batch).unwrap();
        let meals = float64_column(&cleaned, MEAL_COUNT).unwrap();
        assert_eq!(meals.value(3), 5.0);
    }

    #[test]
    fn test_every_cleaned_batch_has_uniform_fields() {
        let batch = raw(r#"[{"meal_type": "Lunch"}, {"meal_count": "3", "borough": "X"}]"#);
        let cleaned = Cleaner::clean(batch).unwrap();

        assert!(is_cleaned(&cleaned));
        let names: Vec<&str> = cleaned
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "meal_type",
                MEAL_COUNT,
                "borough",
                AVERAGE_DAILY_ATTENDANCE,
                SCHOOL_TYPE,
                CITY,
                AS_OF_DATE,
            ]
        );
        assert_eq!(utf8_column(&cleaned, "meal_type").unwrap().value(0), "Lunch");
        assert!(utf8_column(&cleaned, CITY).unwrap().is_null(0));
    }

    #[test]
    fn test_unparsable_date_becomes_missing() {
        let batch = raw(r#"[{"as_of_date": "someday"}, {"as_of_date": "2024-05-02T00:00:00.000"}]"#);
        let (cleaned, report) = Cleaner::clean_with_report(batch).unwrap();
        let dates = date32_column(&cleaned, AS_OF_DATE).unwrap();

        assert!(dates.is_null(0));
        assert!(!dates.is_null(1));
        assert_eq!(report.unparsable_dates, 1);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let batch = raw(
            r#"[
                {"meal_count": "10", "average_daily_attendance": "200.5", "city": " NYC ", "school_type": "Public", "as_of_date": "2024-03-01", "meal_type": "Lunch"},
                {"meal_count": "bad", "city": "Albany", "school_type": null, "as_of_date": "nope", "meal_type": "Breakfast"},
                {"meal_count": "3", "average_daily_attendance": "x", "as_of_date": "2024-04-11"}
            ]"#,
        );

        let once = Cleaner::clean(batch).unwrap();
        let (twice, report) = Cleaner::clean_with_report(once.clone()).unwrap();

        assert_eq!(once, twice);
        assert!(report.imputed.values().all(|&n| n == 0));
        assert_eq!(report.school_type_filled, 0);
        assert_eq!(report.unparsable_dates, 0);
    }

    #[test]
    fn test_empty_batch_cleans_to_empty_batch() {
        let cleaned = Cleaner::clean(raw("[]")).unwrap();
        assert_eq!(cleaned.num_rows(), 0);
        assert!(is_cleaned(&cleaned));
    }
}
