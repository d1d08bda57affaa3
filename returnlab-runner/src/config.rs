//! Serializable pipeline configuration (TOML).
//!
//! ```toml
//! [run]
//! assets = ["AAPL", "TSLA", "MSFT", "BTC-USD", "ETH-USD"]
//! start_date = "2023-01-01"
//! end_date = "2025-12-31"
//! source = "yahoo"
//! workers = 1
//!
//! [output]
//! dir = "output"
//! preview_rows = 5
//! precision = 2
//! ```

use chrono::NaiveDate;
use returnlab_core::rounding::MAX_DECIMAL_PLACES;
use returnlab_core::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("empty date range: start_date {start} is after end_date {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("asset '{0}' is listed more than once")]
    DuplicateAsset(AssetId),

    #[error("assets '{first}' and '{second}' would both be written as '{stem}' files")]
    FileStemCollision {
        first: AssetId,
        second: AssetId,
        stem: String,
    },

    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("precision {0} exceeds the maximum of {max} decimal places", max = MAX_DECIMAL_PLACES)]
    PrecisionTooHigh(u32),

    #[error("source = \"csv\" requires run.csv_dir")]
    MissingCsvDir,
}

/// Where raw prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Yahoo Finance chart API (network).
    Yahoo,
    /// Deterministic random walk (offline).
    Synthetic,
    /// Per-asset CSV files previously written by the exporter.
    Csv,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "synthetic" => Ok(SourceKind::Synthetic),
            "csv" => Ok(SourceKind::Csv),
            other => Err(format!("unknown source '{other}'. Valid: yahoo, synthetic, csv")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Ordered asset list. Order is preserved in every output.
    pub assets: Vec<AssetId>,
    /// First date of the range (inclusive).
    pub start_date: NaiveDate,
    /// Last date of the range (inclusive).
    pub end_date: NaiveDate,
    #[serde(default = "default_source")]
    pub source: SourceKind,
    /// Size of the per-asset worker pool; 1 runs sequentially.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seed for the synthetic source.
    #[serde(default)]
    pub seed: u64,
    /// Directory read by the CSV source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Rows shown per asset in the console preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Decimal places for summary statistics.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Write per-asset Parquet files next to the CSVs.
    #[serde(default)]
    pub parquet: bool,
    /// Assets to chart. Empty means the first configured asset.
    #[serde(default)]
    pub chart_assets: Vec<AssetId>,
    /// Write files at all (false = console only).
    #[serde(default = "default_true")]
    pub export: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            preview_rows: default_preview_rows(),
            precision: default_precision(),
            parquet: false,
            chart_assets: Vec::new(),
            export: true,
        }
    }
}

fn default_source() -> SourceKind {
    SourceKind::Yahoo
}
fn default_workers() -> usize {
    1
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_preview_rows() -> usize {
    5
}
fn default_precision() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

/// Calendar date from literal components. Only called with constant, valid dates.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("constant calendar date is valid")
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub run: RunSection,
    #[serde(default)]
    pub output: OutputSection,
}

impl PipelineConfig {
    /// Load a config from a TOML file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The five-asset dashboard: three equities and two crypto pairs, 2023–2025.
    pub fn default_dashboard() -> Self {
        Self {
            run: RunSection {
                assets: ["AAPL", "TSLA", "MSFT", "BTC-USD", "ETH-USD"]
                    .into_iter()
                    .map(AssetId::from)
                    .collect(),
                start_date: ymd(2023, 1, 1),
                end_date: ymd(2025, 12, 31),
                source: SourceKind::Yahoo,
                workers: 1,
                seed: 0,
                csv_dir: None,
            },
            output: OutputSection::default(),
        }
    }

    /// Reject configurations no run could honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.start_date > self.run.end_date {
            return Err(ConfigError::EmptyRange {
                start: self.run.start_date,
                end: self.run.end_date,
            });
        }

        let mut seen = HashSet::new();
        for asset in &self.run.assets {
            if !seen.insert(asset) {
                return Err(ConfigError::DuplicateAsset(asset.clone()));
            }
        }

        let mut stems: HashMap<String, &AssetId> = HashMap::new();
        for asset in &self.run.assets {
            let stem = asset.file_stem();
            if let Some(first) = stems.insert(stem.clone(), asset) {
                return Err(ConfigError::FileStemCollision {
                    first: first.clone(),
                    second: asset.clone(),
                    stem,
                });
            }
        }

        if self.run.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.output.precision > MAX_DECIMAL_PLACES {
            return Err(ConfigError::PrecisionTooHigh(self.output.precision));
        }
        if self.run.source == SourceKind::Csv && self.run.csv_dir.is_none() {
            return Err(ConfigError::MissingCsvDir);
        }
        Ok(())
    }

    /// Assets to render charts for.
    pub fn chart_assets(&self) -> Vec<AssetId> {
        if self.output.chart_assets.is_empty() {
            self.run.assets.iter().take(1).cloned().collect()
        } else {
            self.output.chart_assets.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dashboard_is_valid() {
        let config = PipelineConfig::default_dashboard();
        config.validate().unwrap();
        assert_eq!(config.run.assets.len(), 5);
        assert_eq!(config.run.assets[3], AssetId::new("BTC-USD"));
        assert_eq!(config.output.preview_rows, 5);
        assert_eq!(config.output.precision, 2);
    }

    #[test]
    fn toml_roundtrip() {
        let config = PipelineConfig::default_dashboard();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [run]
            assets = ["B", "A"]
            start_date = "2024-01-01"
            end_date = "2024-06-30"
            "#,
        )
        .unwrap();
        assert_eq!(config.run.source, SourceKind::Yahoo);
        assert_eq!(config.run.workers, 1);
        assert_eq!(config.output, OutputSection::default());
        assert_eq!(config.chart_assets(), vec![AssetId::new("B")]);
    }

    #[test]
    fn rejects_inverted_range() {
        let err = PipelineConfig::from_toml(
            r#"
            [run]
            assets = ["A"]
            start_date = "2024-02-01"
            end_date = "2024-01-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRange { .. }));
    }

    #[test]
    fn rejects_duplicate_assets() {
        let mut config = PipelineConfig::default_dashboard();
        config.run.assets.push("AAPL".into());
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateAsset(a)) if a.as_str() == "AAPL"));
    }

    #[test]
    fn rejects_assets_sharing_a_file_stem() {
        let mut config = PipelineConfig::default_dashboard();
        config.run.assets = vec!["A/B".into(), "MSFT".into(), "A_B".into()];
        match config.validate() {
            Err(ConfigError::FileStemCollision { first, second, stem }) => {
                assert_eq!(first.as_str(), "A/B");
                assert_eq!(second.as_str(), "A_B");
                assert_eq!(stem, "A_B");
            }
            other => panic!("expected a file stem collision, got {other:?}"),
        }
    }

    #[test]
    fn default_dashboard_spans_2023_through_2025() {
        let config = PipelineConfig::default_dashboard();
        assert_eq!(config.run.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(config.run.end_date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn rejects_zero_workers_and_excess_precision() {
        let mut config = PipelineConfig::default_dashboard();
        config.run.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWorkers)));

        let mut config = PipelineConfig::default_dashboard();
        config.output.precision = 11;
        assert!(matches!(config.validate(), Err(ConfigError::PrecisionTooHigh(11))));
    }

    #[test]
    fn csv_source_needs_a_directory() {
        let mut config = PipelineConfig::default_dashboard();
        config.run.source = SourceKind::Csv;
        assert!(matches!(config.validate(), Err(ConfigError::MissingCsvDir)));
        config.run.csv_dir = Some(PathBuf::from("output"));
        config.validate().unwrap();
    }

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("Synthetic".parse::<SourceKind>().unwrap(), SourceKind::Synthetic);
        assert!("bloomberg".parse::<SourceKind>().is_err());
    }

    #[test]
    fn explicit_chart_assets_win() {
        let mut config = PipelineConfig::default_dashboard();
        config.output.chart_assets = vec!["ETH-USD".into()];
        assert_eq!(config.chart_assets(), vec![AssetId::new("ETH-USD")]);
    }
}
