//! Read-only data-quality checks over a raw batch.
//!
//! Every check borrows the batch and leaves it untouched, so the checks can run
//! in any order or concurrently against the same snapshot.

use crate::utils::arrow::{required_column, string_values};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use chrono::{DateTime, Utc};
use common::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: String,
    pub non_null: usize,
}

/// Snapshot of the checks for one batch. Built once, only read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub record_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub null_counts: BTreeMap<String, usize>,
    pub duplicate_rows: usize,
    pub frequencies: BTreeMap<String, Vec<ValueCount>>,
    pub generated_at: DateTime<Utc>,
}

pub struct QualityInspector;

impl QualityInspector {
    /// Column name, type and non-null count, the way a dataframe summary
    /// lists them.
    pub fn column_profiles(batch: &RecordBatch) -> Vec<ColumnProfile> {
        let profiles: Vec<ColumnProfile> = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, column)| ColumnProfile {
                name: field.name().clone(),
                data_type: field.data_type().to_string(),
                non_null: column.len() - column.null_count(),
            })
            .collect();

        for profile in &profiles {
            info!(
                column = %profile.name,
                data_type = %profile.data_type,
                non_null = profile.non_null,
                "Column profile"
            );
        }
        profiles
    }

    pub fn null_census(batch: &RecordBatch) -> BTreeMap<String, usize> {
        let census: BTreeMap<String, usize> = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, column)| (field.name().clone(), column.null_count()))
            .collect();

        info!(nulls = ?census, "Null values per column");
        census
    }

    /// Rows equal in every column to some earlier row. Nulls compare equal.
    pub fn duplicate_count(batch: &RecordBatch) -> Result<usize> {
        if batch.num_columns() == 0 {
            return Ok(batch.num_rows().saturating_sub(1));
        }

        let sort_fields = batch
            .schema()
            .fields()
            .iter()
            .map(|f| SortField::new(f.data_type().clone()))
            .collect();
        let converter = RowConverter::new(sort_fields)?;
        let rows = converter.convert_columns(batch.columns())?;

        let mut seen = HashSet::with_capacity(rows.num_rows());
        let duplicates = rows.iter().filter(|row| !seen.insert(*row)).count();

        info!(duplicates, "Total duplicated rows");
        Ok(duplicates)
    }

    /// Occurrences of each non-null value, most frequent first. Ties are
    /// ordered by value.
    pub fn categorical_frequency(batch: &RecordBatch, field: &str) -> Result<Vec<ValueCount>> {
        let column = required_column(batch, field)?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in string_values(column)?.into_iter().flatten() {
            *counts.entry(value).or_insert(0) += 1;
        }

        let mut frequencies: Vec<ValueCount> = counts
            .into_iter()
            .map(|(value, count)| ValueCount { value, count })
            .collect();
        frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

        info!(
            field,
            distinct = frequencies.len(),
            top = ?frequencies.first().map(|v| (&v.value, v.count)),
            "Categorical frequencies"
        );
        Ok(frequencies)
    }

    pub fn inspect(batch: &RecordBatch, categorical_fields: &[String]) -> Result<QualityReport> {
        let frequencies = categorical_fields
            .iter()
            .map(|field| Ok((field.clone(), Self::categorical_frequency(batch, field)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(QualityReport {
            record_count: batch.num_rows(),
            columns: Self::column_profiles(batch),
            null_counts: Self::null_census(batch),
            duplicate_rows: Self::duplicate_count(batch)?,
            frequencies,
            generated_at: Utc::now(),
        })
    }
}
