use crate::models::schema::MEAL_COUNT;
use crate::utils::arrow::float64_column;
use arrow::array::Float64Array;
use arrow::compute::filter_record_batch;
use arrow::compute::kernels::cmp::gt;
use arrow::record_batch::RecordBatch;
use common::Result;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
}

pub struct Filter;

impl Filter {
    /// Keeps rows whose `meal_count` is strictly positive. Expects a cleaned
    /// batch; an empty result is a valid outcome.
    pub fn filter_valid(batch: RecordBatch) -> Result<RecordBatch> {
        Self::filter_with_stats(batch).map(|(batch, _)| batch)
    }

    pub fn filter_with_stats(batch: RecordBatch) -> Result<(RecordBatch, FilterStats)> {
        let meals = float64_column(&batch, MEAL_COUNT)?;
        let keep = gt(meals, &Float64Array::new_scalar(0.0))?;
        let filtered = filter_record_batch(&batch, &keep)?;

        let stats = FilterStats {
            rows_before: batch.num_rows(),
            rows_after: filtered.num_rows(),
            rows_removed: batch.num_rows() - filtered.num_rows(),
        };
        info!(
            rows_before = stats.rows_before,
            rows_after = stats.rows_after,
            rows_removed = stats.rows_removed,
            "Invalid rows filtered out"
        );

        Ok((filtered, stats))
    }
}
