use crate::processor::{AggregatedSummary, Aggregator, Cleaner, CleaningReport, Filter, FilterStats};
use crate::storage::SummaryStore;
use arrow::record_batch::RecordBatch;
use common::Result;
use etl::DataSource;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;
use tracing::info;

/// Rows of the summary echoed to the log after a run.
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct EtlOutcome {
    pub cleaning: CleaningReport,
    pub filter: FilterStats,
    pub summary: AggregatedSummary,
    pub output: Option<PathBuf>,
}

/// Clean, filter and aggregate in that order, each stage taking the previous
/// stage's batch by value.
pub struct EtlService {
    source: Arc<dyn DataSource>,
    store: Option<SummaryStore>,
}

impl EtlService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source, store: None }
    }

    pub fn with_store(mut self, store: SummaryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transform(batch: RecordBatch) -> Result<(CleaningReport, FilterStats, AggregatedSummary)> {
        let (cleaned, cleaning) = Cleaner::clean_with_report(batch)?;
        let (valid, filter) = Filter::filter_with_stats(cleaned)?;
        let summary = Aggregator::aggregate(valid)?;
        Ok((cleaning, filter, summary))
    }

    pub async fn run(&self) -> Result<EtlOutcome> {
        let batch = self.source.fetch().await?;
        let (cleaning, filter, summary) = task::spawn_blocking(move || Self::transform(batch)).await??;

        for row in summary.head(PREVIEW_ROWS)? {
            info!(%row, "Summary row");
        }

        let output = match &self.store {
            Some(store) => Some(store.write_summary(&summary)?),
            None => None,
        };

        Ok(EtlOutcome {
            cleaning,
            filter,
            summary,
            output,
        })
    }
}
