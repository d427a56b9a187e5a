//! Data module
//!
//! Provides:
//! - Positional CSV loading with fail-fast parsing
//! - Observation and schema types
//! - Datasets with seeded train/test partitioning

mod dataset;
mod loader;
mod observation;

pub use dataset::Dataset;
pub use loader::{load_observations, parse_label, parse_ratio, read_sample, CsvLoader};
pub use observation::{ColumnKind, ColumnSpec, Delimiter, Observation, Schema};
