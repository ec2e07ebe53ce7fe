use crate::processor::{AggregatedSummary, QualityReport};
use common::Result;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARY_FILE: &str = "monthly_summary.parquet";
pub const QUALITY_REPORT_FILE: &str = "quality_report.json";

/// Local directory holding the pipeline outputs. Each write replaces the
/// previous file.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    directory: PathBuf,
}

impl SummaryStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn write_summary(&self, summary: &AggregatedSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(SUMMARY_FILE);

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, summary.batch.schema(), Some(props))?;
        writer.write(&summary.batch)?;
        writer.close()?;

        info!(path = %path.display(), rows = summary.num_groups(), "Summary written");
        Ok(path)
    }

    pub fn write_report(&self, report: &QualityReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(QUALITY_REPORT_FILE);

        let contents = serde_json::to_vec_pretty(report)?;
        fs::write(&path, contents)?;

        info!(path = %path.display(), records = report.record_count, "Quality report written");
        Ok(path)
    }
}
