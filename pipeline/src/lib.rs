pub mod logging;
pub mod models;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;

use common::Result;
use common::config::Settings;
use processor::QualityReport;
use services::{AllOutcome, EtlOutcome, Pipelines, TrendOutcome};
use tracing::info;

/// Volume-trend gate. `count` skips the fetch when the caller already knows
/// today's record count.
pub async fn run_trend_pipeline(settings: &Settings, count: Option<u64>) -> Result<TrendOutcome> {
    let pipelines = Pipelines::from_settings(settings)?;
    let outcome = pipelines.trend.run(count).await?;
    info!(verdict = ?outcome.assessment.verdict, "Trend pipeline finished");
    Ok(outcome)
}

pub async fn run_exploration_pipeline(settings: &Settings) -> Result<QualityReport> {
    let pipelines = Pipelines::from_settings(settings)?;
    pipelines.exploration.run().await
}

pub async fn run_etl_pipeline(settings: &Settings) -> Result<EtlOutcome> {
    let pipelines = Pipelines::from_settings(settings)?;
    let outcome = pipelines.etl.run().await?;
    info!(
        groups = outcome.summary.num_groups(),
        rows_removed = outcome.filter.rows_removed,
        "ETL pipeline finished"
    );
    Ok(outcome)
}

pub async fn run_all_pipelines(settings: &Settings) -> Result<AllOutcome> {
    Pipelines::from_settings(settings)?.run_all().await
}
