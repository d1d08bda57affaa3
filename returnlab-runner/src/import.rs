//! Offline market data source backed by previously exported series CSVs.
//!
//! Reads `{dir}/{asset_stem}_data.csv` (the layout the exporter writes) and
//! hands the rows to the normalizer untouched; range filtering and close
//! validation happen there like for any other source.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use returnlab_core::{AssetId, FetchError, MarketDataSource, RawPricePoint};
use tracing::debug;

use crate::export::read_series_csv;

/// File name of an asset's series CSV.
pub fn series_file_name(asset: &AssetId) -> String {
    format!("{}_data.csv", asset.file_stem())
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, asset: &AssetId) -> PathBuf {
        self.dir.join(series_file_name(asset))
    }
}

impl MarketDataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        asset: &AssetId,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        let path = self.path_for(asset);
        if !path.exists() {
            return Err(FetchError::SymbolNotFound {
                symbol: asset.to_string(),
            });
        }

        let records = read_series_csv(&path).map_err(|e| FetchError::Io {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        })?;
        debug!(%asset, rows = records.len(), path = %path.display(), "loaded series CSV");

        Ok(records
            .into_iter()
            .map(|r| RawPricePoint::close_only(r.date, r.close))
            .collect())
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
