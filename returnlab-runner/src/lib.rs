//! ReturnLab Runner — portfolio aggregation, summaries, exports, charts.
//!
//! This crate builds on `returnlab-core` to provide:
//! - The portfolio aggregator with per-asset fault isolation and a bounded worker pool
//! - Summary statistics (mean/max daily return, round-half-to-even)
//! - TOML pipeline configuration
//! - CSV, Parquet, SVG chart, and JSON manifest artifacts
//! - A CSV-backed market data source for offline re-runs
//! - Fixed-width console previews

pub mod artifacts;
pub mod chart;
pub mod config;
pub mod export;
pub mod import;
pub mod manifest;
pub mod pipeline;
pub mod preview;
pub mod runner;
pub mod summary;

pub use artifacts::{save_run, ArtifactOptions, ArtifactPaths};
pub use config::{ConfigError, OutputSection, PipelineConfig, RunSection, SourceKind};
pub use import::CsvSource;
pub use manifest::{dataset_hash, RunManifest, SCHEMA_VERSION};
pub use pipeline::{
    aggregate, aggregate_with_progress, AggregateOptions, AssetFault, AssetStatus, CancelToken,
    FaultKind, LogProgress, NoProgress, PipelineError, PipelineProgress, PortfolioRun,
};
pub use runner::{build_source, run_from_config};
pub use summary::{summarize, Statistic, SummaryRow, SummaryTable, SummaryTableBuilder};
