use crate::processor::{QualityInspector, QualityReport};
use crate::storage::SummaryStore;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use common::Result;
use etl::DataSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task;
use tracing::info;

pub struct ExplorationService {
    source: Arc<dyn DataSource>,
    categorical_fields: Vec<String>,
    store: Option<SummaryStore>,
}

impl ExplorationService {
    pub fn new(source: Arc<dyn DataSource>, categorical_fields: Vec<String>) -> Self {
        Self {
            source,
            categorical_fields,
            store: None,
        }
    }

    pub fn with_store(mut self, store: SummaryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn run(&self) -> Result<QualityReport> {
        let batch = self.source.fetch().await?;
        let report = Self::explore(batch, &self.categorical_fields).await?;

        info!(
            records = report.record_count,
            duplicate_rows = report.duplicate_rows,
            null_counts = ?report.null_counts,
            "Data exploration finished"
        );

        if let Some(store) = &self.store {
            store.write_report(&report)?;
        }
        Ok(report)
    }

    /// Runs the null census, duplicate count and frequency checks concurrently
    /// on the same snapshot. Each task gets its own handle to the batch.
    pub async fn explore(batch: RecordBatch, categorical_fields: &[String]) -> Result<QualityReport> {
        let nulls = {
            let batch = batch.clone();
            task::spawn_blocking(move || QualityInspector::null_census(&batch))
        };
        let duplicates = {
            let batch = batch.clone();
            task::spawn_blocking(move || QualityInspector::duplicate_count(&batch))
        };
        let frequencies = {
            let batch = batch.clone();
            let fields = categorical_fields.to_vec();
            task::spawn_blocking(move || {
                fields
                    .into_iter()
                    .map(|field| {
                        let counts = QualityInspector::categorical_frequency(&batch, &field)?;
                        Ok((field, counts))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()
            })
        };

        let (null_counts, duplicate_rows, frequencies) = tokio::try_join!(nulls, duplicates, frequencies)?;

        Ok(QualityReport {
            record_count: batch.num_rows(),
            columns: QualityInspector::column_profiles(&batch),
            null_counts,
            duplicate_rows: duplicate_rows?,
            frequencies: frequencies?,
            generated_at: Utc::now(),
        })
    }
}
