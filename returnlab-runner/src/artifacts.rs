//! Writes the full artifact set for a run into one output directory.
//!
//! ```text
//! {output_dir}/
//!   {asset}_data.csv       one per asset, configured order
//!   {asset}_data.parquet   optional
//!   {asset}_chart.svg      charted assets only
//!   summary.csv
//!   manifest.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use returnlab_core::AssetId;
use tracing::{info, warn};

use crate::chart::{chart_file_name, write_price_chart};
use crate::config::PipelineConfig;
use crate::export::{write_series_csv, write_series_parquet, write_summary_csv};
use crate::import::series_file_name;
use crate::manifest::RunManifest;
use crate::pipeline::PortfolioRun;

#[derive(Debug, Clone, Default)]
pub struct ArtifactOptions {
    pub parquet: bool,
    pub chart_assets: Vec<AssetId>,
}

impl ArtifactOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            parquet: config.output.parquet,
            chart_assets: config.chart_assets(),
        }
    }
}

/// Paths of everything [`save_run`] wrote.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub series_csv: Vec<PathBuf>,
    pub series_parquet: Vec<PathBuf>,
    pub charts: Vec<PathBuf>,
    pub summary_csv: PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.series_csv
            .iter()
            .chain(&self.series_parquet)
            .chain(&self.charts)
            .chain([&self.summary_csv, &self.manifest])
    }
}

/// Write series files, charts, the summary CSV, and the manifest.
///
/// Faulted assets still get a (header-only) series CSV so the file set
/// always matches the configured asset list.
pub fn save_run(
    run: &PortfolioRun,
    output_dir: &Path,
    options: &ArtifactOptions,
    config: Option<&PipelineConfig>,
) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let mut paths = ArtifactPaths {
        dir: output_dir.to_path_buf(),
        ..ArtifactPaths::default()
    };

    for (asset, prices, returns) in run.ordered() {
        let csv_path = output_dir.join(series_file_name(asset));
        write_series_csv(&csv_path, prices, returns)?;
        paths.series_csv.push(csv_path);

        if options.parquet {
            let pq_path = output_dir.join(format!("{}_data.parquet", asset.file_stem()));
            write_series_parquet(&pq_path, prices, returns)?;
            paths.series_parquet.push(pq_path);
        }
    }

    for asset in &options.chart_assets {
        let Some(prices) = run.prices(asset) else {
            warn!(%asset, "chart requested for an asset not in this run");
            continue;
        };
        let chart_path = output_dir.join(chart_file_name(asset));
        write_price_chart(&chart_path, asset, prices)?;
        paths.charts.push(chart_path);
    }

    paths.summary_csv = output_dir.join("summary.csv");
    write_summary_csv(&paths.summary_csv, &run.summary)?;

    paths.manifest = output_dir.join("manifest.json");
    let json = RunManifest::from_run(run, config).to_json()?;
    std::fs::write(&paths.manifest, json)
        .with_context(|| format!("failed to write {}", paths.manifest.display()))?;

    info!(dir = %output_dir.display(), files = paths.all().count(), "artifacts saved");
    Ok(paths)
}
