//! Dataset ingestion
//!
//! Reads the raw student records, checks them against the [`FeatureSpec`],
//! keeps an audit copy and produces the deterministic train/test split.

mod config;
mod loader;
mod schema;
mod splitter;

pub use config::SplitConfig;
pub use loader::{normalize_frame, ColumnInfo, DataLoader, DataSaver, DatasetInfo};
pub use schema::{FeatureSpec, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS, TARGET_COLUMN};
pub use splitter::{split_indices, DatasetSplitter, Split, SplitIndices, SplitPaths};
