pub mod summary;

pub use summary::{QUALITY_REPORT_FILE, SUMMARY_FILE, SummaryStore};
