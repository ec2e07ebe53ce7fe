use crate::models::schema::{
    AS_OF_DATE, AVERAGE_DAILY_ATTENDANCE, CITY, MEAL_COUNT, SCHOOL_TYPE, summary_schema,
};
use crate::utils::arrow::{batch_to_json, date32_column, float64_column, utf8_column};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt32Array};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use common::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// (city, school_type, month)
pub type GroupKey = (String, String, u32);

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    meal_count: f64,
    attendance: f64,
}

/// Monthly totals per city and school type, one row per key in key order.
#[derive(Debug, Clone)]
pub struct AggregatedSummary {
    pub batch: RecordBatch,
    pub input_rows: usize,
    pub excluded_missing_date: usize,
    /// Rows whose city or school type was missing.
    pub excluded_missing_key: usize,
}

impl AggregatedSummary {
    pub fn num_groups(&self) -> usize {
        self.batch.num_rows()
    }

    /// First `limit` rows as JSON objects, for logs and reports.
    pub fn head(&self, limit: usize) -> Result<Vec<Value>> {
        batch_to_json(&self.batch, limit)
    }
}

pub struct Aggregator;

impl Aggregator {
    pub fn aggregate(batch: RecordBatch) -> Result<AggregatedSummary> {
        let cities = utf8_column(&batch, CITY)?;
        let school_types = utf8_column(&batch, SCHOOL_TYPE)?;
        let dates = date32_column(&batch, AS_OF_DATE)?;
        let meals = float64_column(&batch, MEAL_COUNT)?;
        let attendance = float64_column(&batch, AVERAGE_DAILY_ATTENDANCE)?;

        let mut groups: BTreeMap<GroupKey, Totals> = BTreeMap::new();
        let mut excluded_missing_date = 0;
        let mut excluded_missing_key = 0;

        for row in 0..batch.num_rows() {
            let Some(date) = dates.value_as_date(row).filter(|_| dates.is_valid(row)) else {
                excluded_missing_date += 1;
                continue;
            };
            if cities.is_null(row) || school_types.is_null(row) {
                excluded_missing_key += 1;
                continue;
            }

            let key = (
                cities.value(row).to_string(),
                school_types.value(row).to_string(),
                date.month(),
            );
            let totals = groups.entry(key).or_default();
            if meals.is_valid(row) {
                totals.meal_count += meals.value(row);
            }
            if attendance.is_valid(row) {
                totals.attendance += attendance.value(row);
            }
        }

        let summary = Self::build(groups)?;
        info!(
            input_rows = batch.num_rows(),
            groups = summary.num_rows(),
            excluded_missing_date,
            excluded_missing_key,
            "Aggregated data created"
        );

        Ok(AggregatedSummary {
            batch: summary,
            input_rows: batch.num_rows(),
            excluded_missing_date,
            excluded_missing_key,
        })
    }

    fn build(groups: BTreeMap<GroupKey, Totals>) -> Result<RecordBatch> {
        let cities: StringArray = groups.keys().map(|(city, _, _)| Some(city.as_str())).collect();
        let school_types: StringArray = groups
            .keys()
            .map(|(_, school_type, _)| Some(school_type.as_str()))
            .collect();
        let months: UInt32Array = groups.keys().map(|(_, _, month)| Some(*month)).collect();
        let meal_totals: Float64Array = groups.values().map(|t| Some(t.meal_count)).collect();
        let attendance_totals: Float64Array = groups.values().map(|t| Some(t.attendance)).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(cities),
            Arc::new(school_types),
            Arc::new(months),
            Arc::new(meal_totals),
            Arc::new(attendance_totals),
        ];
        Ok(RecordBatch::try_new(Arc::new(summary_schema()), columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{MONTH, TOTAL_ATTENDANCE, TOTAL_MEAL_COUNT};
    use crate::processor::cleaner::Cleaner;
    use arrow::array::Date32Array;
    use arrow::datatypes::{DataType, Date32Type, Field, Schema};
    use chrono::NaiveDate;
    use std::collections::HashSet;

    struct Row<'a> {
        city: Option<&'a str>,
        school_type: Option<&'a str>,
        date: Option<(i32, u32, u32)>,
        meals: f64,
        attendance: f64,
    }

    fn row<'a>(city: &'a str, school_type: &'a str, date: (i32, u32, u32), meals: f64) -> Row<'a> {
        Row {
            city: Some(city),
            school_type: Some(school_type),
            date: Some(date),
            meals,
            attendance: meals * 10.0,
        }
    }

    fn cleaned_batch(rows: &[Row]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new(MEAL_COUNT, DataType::Float64, true),
            Field::new(AVERAGE_DAILY_ATTENDANCE, DataType::Float64, true),
            Field::new(SCHOOL_TYPE, DataType::Utf8, true),
            Field::new(CITY, DataType::Utf8, true),
            Field::new(AS_OF_DATE, DataType::Date32, true),
        ]);
        let dates: Date32Array = rows
            .iter()
            .map(|r| {
                r.date.map(|(y, m, d)| {
                    Date32Type::from_naive_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
                })
            })
            .collect();
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.meals))),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.attendance))),
                Arc::new(rows.iter().map(|r| r.school_type).collect::<StringArray>()),
                Arc::new(rows.iter().map(|r| r.city).collect::<StringArray>()),
                Arc::new(dates),
            ],
        )
        .unwrap()
    }

    fn keys(summary: &AggregatedSummary) -> Vec<GroupKey> {
        let batch = &summary.batch;
        let cities = utf8_column(batch, CITY).unwrap();
        let school_types = utf8_column(batch, SCHOOL_TYPE).unwrap();
        let months = batch
            .column_by_name(MONTH)
            .unwrap()
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        (0..batch.num_rows())
            .map(|i| {
                (
                    cities.value(i).to_string(),
                    school_types.value(i).to_string(),
                    months.value(i),
                )
            })
            .collect()
    }

    #[test]
    fn test_groups_are_unique_and_sorted() {
        let batch = cleaned_batch(&[
            row("nyc", "public", (2024, 3, 1), 10.0),
            row("albany", "public", (2024, 3, 2), 1.0),
            row("nyc", "public", (2024, 3, 20), 5.0),
            row("nyc", "charter", (2024, 3, 1), 2.0),
            row("nyc", "public", (2024, 4, 1), 7.0),
            row("nyc", "public", (2023, 3, 9), 1.0),
        ]);

        let summary = Aggregator::aggregate(batch).unwrap();
        let keys = keys(&summary);

        let unique: HashSet<&GroupKey> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert_eq!(
            keys,
            vec![
                ("albany".to_string(), "public".to_string(), 3),
                ("nyc".to_string(), "charter".to_string(), 3),
                ("nyc".to_string(), "public".to_string(), 3),
                ("nyc".to_string(), "public".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_sums_cover_exactly_the_rows_of_each_group() {
        let batch = cleaned_batch(&[
            row("nyc", "public", (2024, 3, 1), 10.0),
            row("nyc", "public", (2024, 3, 20), 5.5),
            row("nyc", "public", (2023, 3, 9), 1.0),
            row("nyc", "public", (2024, 4, 1), 7.0),
        ]);

        let summary = Aggregator::aggregate(batch).unwrap();
        let totals = float64_column(&summary.batch, TOTAL_MEAL_COUNT).unwrap();
        let attendance = float64_column(&summary.batch, TOTAL_ATTENDANCE).unwrap();

        // Month ignores the year: March 2023 and March 2024 share a group.
        assert_eq!(totals.values().to_vec(), vec![16.5, 7.0]);
        assert_eq!(attendance.values().to_vec(), vec![165.0, 70.0]);
    }

    #[test]
    fn test_rows_without_date_or_key_are_excluded_and_counted() {
        let batch = cleaned_batch(&[
            row("nyc", "public", (2024, 3, 1), 10.0),
            Row {
                date: None,
                ..row("nyc", "public", (2024, 3, 1), 99.0)
            },
            Row {
                city: None,
                ..row("nyc", "public", (2024, 3, 1), 50.0)
            },
        ]);

        let summary = Aggregator::aggregate(batch).unwrap();

        assert_eq!(summary.num_groups(), 1);
        assert_eq!(summary.input_rows, 3);
        assert_eq!(summary.excluded_missing_date, 1);
        assert_eq!(summary.excluded_missing_key, 1);
        assert_eq!(
            float64_column(&summary.batch, TOTAL_MEAL_COUNT).unwrap().value(0),
            10.0
        );
    }

    #[test]
    fn test_empty_input_gives_empty_summary() {
        let summary = Aggregator::aggregate(cleaned_batch(&[])).unwrap();
        assert_eq!(summary.num_groups(), 0);
        assert_eq!(summary.batch.schema().as_ref(), &summary_schema());
    }

    #[test]
    fn test_head_renders_rows() {
        let batch = Cleaner::clean(
            etl::records_to_batch(
                &etl::parse_records(
                    br#"[{"meal_count": "4", "city": "NYC", "school_type": "Public", "as_of_date": "2024-06-03"}]"#,
                )
                .unwrap(),
            )
            .unwrap(),
        )
        .unwrap();

        let head = Aggregator::aggregate(batch).unwrap().head(5).unwrap();
        assert_eq!(head.len(), 1);
        assert_eq!(head[0]["city"], "nyc");
        assert_eq!(head[0]["month"], 6);
        assert_eq!(head[0]["total_meal_count"], 4.0);
    }
}
