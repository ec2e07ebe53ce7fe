pub mod aggregate;
pub mod cleaner;
pub mod filter;
pub mod quality;
pub mod trend;

pub use aggregate::{AggregatedSummary, Aggregator};
pub use cleaner::{Cleaner, CleaningReport};
pub use filter::{Filter, FilterStats};
pub use quality::{QualityInspector, QualityReport};
pub use trend::{TrendAssessment, TrendBaseline, TrendValidator, ValidationVerdict};
