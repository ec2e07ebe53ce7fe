//! Extraction side of the meals pipeline: the `DataSource` collaborator that
//! turns the remote JSON dataset into a raw Arrow batch.

pub mod records;
pub mod source;
pub mod utils;

pub use records::{parse_records, records_to_batch};
pub use source::{DataSource, HttpDataSource, MemoryDataSource};
