//! Run manifest: a JSON record of what a run used and produced.
//!
//! Carries a `schema_version`; manifests from a newer schema are rejected
//! on load.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use returnlab_core::AssetId;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::pipeline::{AssetFault, PortfolioRun};
use crate::summary::SummaryTable;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub decimal_places: u32,
    pub assets: Vec<AssetId>,
    /// Configuration the run was started from, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
    /// BLAKE3 over the ordered price series (see [`dataset_hash`]).
    pub dataset_hash: String,
    /// Points kept per asset, in asset order.
    pub points: Vec<usize>,
    pub summary: SummaryTable,
    pub faults: Vec<AssetFault>,
    pub warnings: Vec<String>,
}

impl RunManifest {
    pub fn from_run(run: &PortfolioRun, config: Option<&PipelineConfig>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            source: run.source.clone(),
            start: run.start,
            end: run.end,
            decimal_places: run.decimal_places,
            assets: run.assets.clone(),
            config: config.cloned(),
            dataset_hash: dataset_hash(run),
            points: run
                .assets
                .iter()
                .map(|a| run.prices(a).map_or(0, |p| p.len()))
                .collect(),
            summary: run.summary.clone(),
            faults: run.faults.clone(),
            warnings: run.warnings.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize run manifest to JSON")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(json).context("failed to deserialize run manifest from JSON")?;
        if manifest.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported schema version {} (max supported: {})",
                manifest.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Content hash of every asset's canonical price series, in asset order.
///
/// Two runs hash equal iff they saw the same assets in the same order with
/// bit-identical `(date, close)` pairs.
pub fn dataset_hash(run: &PortfolioRun) -> String {
    let mut hasher = blake3::Hasher::new();
    for (asset, prices, _) in run.ordered() {
        hasher.update(asset.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&(prices.len() as u64).to_le_bytes());
        for p in prices {
            hasher.update(p.date.to_string().as_bytes());
            hasher.update(&p.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
