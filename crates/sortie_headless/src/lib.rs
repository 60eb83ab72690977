//! Headless batch runner for scenario outcome datasets.
//!
//! Runs scenario definitions unattended and turns each finished run into a
//! feature row for an external aggregator:
//!
//! - **Catalog**: scenario definitions loaded from a directory of JSON files
//! - **Batch**: sequential runs in throttled chunks, with a JSON report
//! - **Features**: fixed-schema rows from the first and last snapshot
//! - **Aggregator**: HTTP backend, local CSV, or in-memory sink
//!
//! # Example
//!
//! ```bash
//! # Run every scenario in a directory and post rows to the aggregator
//! cargo run -p sortie_headless -- batch --scenarios scenarios/
//!
//! # Offline: append rows to a local CSV instead
//! cargo run -p sortie_headless -- batch --scenarios scenarios/ --csv results/rows.csv
//!
//! # Check definitions before a long batch
//! cargo run -p sortie_headless -- validate --scenarios scenarios/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod aggregator;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod features;

pub use aggregator::{
    submit_feature_row, Aggregator, AggregatorError, CsvFileAggregator, DataResponse,
    DatasetSummary, HttpAggregator, MemoryAggregator,
};
pub use batch::{run_batch, run_scenario, BatchError, BatchReport, BatchStage, RunError, ScenarioRun};
pub use catalog::{CatalogEntry, CatalogError, CatalogIssue, ScenarioCatalog};
pub use config::{BatchConfig, ConfigError, OutcomeThresholds};
pub use features::{
    extract_features, process_recourse_data, ExtractError, FeatureRow, FeatureValue, SideFeatures,
};
