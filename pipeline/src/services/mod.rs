pub mod exploration;
pub mod transform;
pub mod trend;

pub use exploration::ExplorationService;
pub use transform::{EtlOutcome, EtlService};
pub use trend::{TrendOutcome, TrendService};

use crate::processor::QualityReport;
use crate::storage::SummaryStore;
use common::Result;
use common::config::Settings;
use etl::{DataSource, HttpDataSource};
use std::sync::Arc;

/// The three pipelines wired to the configured source and output directory.
pub struct Pipelines {
    pub trend: TrendService,
    pub exploration: ExplorationService,
    pub etl: EtlService,
}

#[derive(Debug)]
pub struct AllOutcome {
    pub trend: TrendOutcome,
    pub report: QualityReport,
    pub etl: EtlOutcome,
}

impl Pipelines {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source: Arc<dyn DataSource> = Arc::new(HttpDataSource::new(&settings.source)?);
        Self::with_source(settings, source)
    }

    pub fn with_source(settings: &Settings, source: Arc<dyn DataSource>) -> Result<Self> {
        let store = SummaryStore::new(&settings.output.directory);
        Ok(Self {
            trend: TrendService::from_settings(settings, Arc::clone(&source))?,
            exploration: ExplorationService::new(
                Arc::clone(&source),
                settings.exploration.categorical_fields.clone(),
            )
            .with_store(store.clone()),
            etl: EtlService::new(source).with_store(store),
        })
    }

    /// Runs the three pipelines concurrently, each with its own fetch. The
    /// first failure aborts the run.
    pub async fn run_all(&self) -> Result<AllOutcome> {
        let (trend, report, etl) = tokio::try_join!(
            self.trend.run(None),
            self.exploration.run(),
            self.etl.run()
        )?;
        Ok(AllOutcome { trend, report, etl })
    }
}
