//! Portfolio aggregator: per-asset fetch, normalize, returns, and summary.
//!
//! One unit of work per asset: fetch from the source, normalize, compute
//! daily returns, fold into a summary row. Units share nothing mutable, so
//! they can run on a bounded rayon pool; results are collected by index so
//! the summary keeps the configured asset order whatever the completion order.
//!
//! Failure policy: a fetch or normalization failure for one asset becomes a
//! recorded [`AssetFault`] plus a "no data" row. Only an inverted date range
//! (a configuration fault) aborts the run, and it does so before any fetch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use returnlab_core::{
    check_range, compute_returns, normalize_with_report, AssetId, FetchError, MarketDataSource,
    NormalizeError, NormalizeReport, PriceSeries, ReturnSeries,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::summary::{summarize, SummaryRow, SummaryTable, SummaryTableBuilder};

/// Run-level errors. Per-asset problems never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("empty date range: start {start} is after end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("could not set up market data source: {0}")]
    Source(#[from] FetchError),
}

/// Category of a per-asset fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The source failed (network, rate limit, unknown symbol, ...).
    Fetch,
    /// The source answered with data that violates integrity (duplicate dates).
    DataIntegrity,
    /// The run was cancelled before this asset started.
    Cancelled,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Fetch => write!(f, "fetch"),
            FaultKind::DataIntegrity => write!(f, "data integrity"),
            FaultKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A recorded per-asset failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFault {
    pub asset: AssetId,
    pub kind: FaultKind,
    pub message: String,
}

impl AssetFault {
    fn fetch(asset: &AssetId, err: &FetchError) -> Self {
        Self {
            asset: asset.clone(),
            kind: FaultKind::Fetch,
            message: err.to_string(),
        }
    }

    fn normalize(asset: &AssetId, err: &NormalizeError) -> Self {
        Self {
            asset: asset.clone(),
            kind: FaultKind::DataIntegrity,
            message: err.to_string(),
        }
    }

    fn cancelled(asset: &AssetId) -> Self {
        Self {
            asset: asset.clone(),
            kind: FaultKind::Cancelled,
            message: "run cancelled before this asset was fetched".into(),
        }
    }
}

impl fmt::Display for AssetFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.asset, self.kind, self.message)
    }
}

/// Cooperative cancellation flag, checked before each asset starts.
///
/// Assets already in flight finish normally; assets not yet started are
/// reported as cancelled with a "no data" row.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Knobs for a single aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Decimal places for summary statistics (round-half-to-even).
    pub decimal_places: u32,
    /// Worker pool size; 1 processes assets sequentially on the caller's thread.
    pub workers: usize,
    pub cancel: CancelToken,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            workers: 1,
            cancel: CancelToken::new(),
        }
    }
}

/// Status of one asset, passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Completed { points: usize },
    Faulted(FaultKind),
}

/// Progress callback for multi-asset runs.
///
/// Callbacks may arrive from worker threads and out of order when the pool
/// has more than one worker.
pub trait PipelineProgress: Send + Sync {
    /// Called when an asset starts fetching.
    fn on_start(&self, asset: &AssetId, index: usize, total: usize);

    /// Called when an asset's unit of work completes.
    fn on_complete(&self, asset: &AssetId, index: usize, total: usize, status: AssetStatus);

    /// Called once when every asset has been accounted for.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl PipelineProgress for LogProgress {
    fn on_start(&self, asset: &AssetId, index: usize, total: usize) {
        info!("[{}/{}] Fetching {asset}...", index + 1, total);
    }

    fn on_complete(&self, asset: &AssetId, _index: usize, _total: usize, status: AssetStatus) {
        match status {
            AssetStatus::Completed { points } => info!(%asset, points, "asset complete"),
            AssetStatus::Faulted(kind) => warn!(%asset, %kind, "asset faulted"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("Run complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_start(&self, _asset: &AssetId, _index: usize, _total: usize) {}
    fn on_complete(&self, _asset: &AssetId, _index: usize, _total: usize, _status: AssetStatus) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Everything one asset's unit of work produced.
#[derive(Debug, Clone)]
struct AssetOutcome {
    prices: PriceSeries,
    returns: ReturnSeries,
    row: SummaryRow,
    fault: Option<AssetFault>,
    report: Option<NormalizeReport>,
}

impl AssetOutcome {
    fn faulted(asset: &AssetId, fault: AssetFault) -> Self {
        Self {
            prices: PriceSeries::empty(),
            returns: ReturnSeries::default(),
            row: SummaryRow::no_data(asset.clone()),
            fault: Some(fault),
            report: None,
        }
    }
}

/// Output of a complete aggregation run.
#[derive(Debug, Clone)]
pub struct PortfolioRun {
    /// Configured asset order.
    pub assets: Vec<AssetId>,
    /// Canonical price series per asset (empty for faulted assets).
    pub prices: HashMap<AssetId, PriceSeries>,
    /// Daily returns per asset, aligned 1:1 with `prices`.
    pub returns: HashMap<AssetId, ReturnSeries>,
    pub summary: SummaryTable,
    pub faults: Vec<AssetFault>,
    /// Data-quality notes (dropped points, empty ranges).
    pub warnings: Vec<String>,
    /// Name of the source the prices came from.
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub decimal_places: u32,
}

impl PortfolioRun {
    pub fn prices(&self, asset: &AssetId) -> Option<&PriceSeries> {
        self.prices.get(asset)
    }

    pub fn returns(&self, asset: &AssetId) -> Option<&ReturnSeries> {
        self.returns.get(asset)
    }

    /// `(asset, prices, returns)` in configured order.
    pub fn ordered(&self) -> impl Iterator<Item = (&AssetId, &PriceSeries, &ReturnSeries)> {
        self.assets.iter().filter_map(move |a| {
            let prices = self.prices.get(a)?;
            let returns = self.returns.get(a)?;
            Some((a, prices, returns))
        })
    }

    pub fn fault_for(&self, asset: &AssetId) -> Option<&AssetFault> {
        self.faults.iter().find(|f| &f.asset == asset)
    }

    pub fn all_succeeded(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Aggregate with `tracing` progress reporting.
pub fn aggregate(
    assets: &[AssetId],
    source: &dyn MarketDataSource,
    start: NaiveDate,
    end: NaiveDate,
    options: &AggregateOptions,
) -> Result<PortfolioRun, PipelineError> {
    aggregate_with_progress(assets, source, start, end, options, &LogProgress)
}

/// Run fetch → normalize → returns → summary over every asset.
///
/// Always returns one summary row per asset in `assets` order. Per-asset
/// failures are recorded in [`PortfolioRun::faults`].
pub fn aggregate_with_progress(
    assets: &[AssetId],
    source: &dyn MarketDataSource,
    start: NaiveDate,
    end: NaiveDate,
    options: &AggregateOptions,
    progress: &dyn PipelineProgress,
) -> Result<PortfolioRun, PipelineError> {
    check_range(start, end).map_err(|_| PipelineError::EmptyRange { start, end })?;

    let total = assets.len();
    let workers = options.workers.max(1);
    info!(
        source = source.name(),
        assets = total,
        %start,
        %end,
        workers,
        "starting aggregation"
    );

    let run_one = |(index, asset): (usize, &AssetId)| {
        process_asset(asset, index, total, source, start, end, options, progress)
    };

    let outcomes: Vec<AssetOutcome> = if workers == 1 || total <= 1 {
        assets.iter().enumerate().map(run_one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.min(total))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;
        // Indexed collect keeps input order regardless of completion order.
        pool.install(|| assets.par_iter().enumerate().map(run_one).collect())
    };

    let mut builder = SummaryTableBuilder::new(assets);
    let mut prices = HashMap::with_capacity(total);
    let mut returns = HashMap::with_capacity(total);
    let mut faults = Vec::new();
    let mut warnings = Vec::new();

    for (index, (asset, outcome)) in assets.iter().zip(outcomes).enumerate() {
        if let Some(report) = outcome.report {
            if report.dropped() > 0 {
                warnings.push(format!(
                    "{asset}: dropped {} of {} points ({} out of range, {} missing or invalid close)",
                    report.dropped(),
                    report.received,
                    report.out_of_range,
                    report.invalid_close
                ));
            }
            if report.kept == 0 {
                warnings.push(format!("{asset}: no usable prices between {start} and {end}"));
            }
        }
        builder.set(index, outcome.row);
        if let Some(fault) = outcome.fault {
            faults.push(fault);
        }
        prices.insert(asset.clone(), outcome.prices);
        returns.insert(asset.clone(), outcome.returns);
    }

    let summary = builder.finish();
    progress.on_batch_complete(total - faults.len(), faults.len(), total);

    Ok(PortfolioRun {
        assets: assets.to_vec(),
        prices,
        returns,
        summary,
        faults,
        warnings,
        source: source.name().to_string(),
        start,
        end,
        decimal_places: options.decimal_places,
    })
}

/// One asset's unit of work. Never panics on bad data and never fails:
/// every problem is folded into the outcome.
#[allow(clippy::too_many_arguments)]
fn process_asset(
    asset: &AssetId,
    index: usize,
    total: usize,
    source: &dyn MarketDataSource,
    start: NaiveDate,
    end: NaiveDate,
    options: &AggregateOptions,
    progress: &dyn PipelineProgress,
) -> AssetOutcome {
    if options.cancel.is_cancelled() {
        debug!(%asset, "skipping asset after cancellation");
        let outcome = AssetOutcome::faulted(asset, AssetFault::cancelled(asset));
        progress.on_complete(asset, index, total, AssetStatus::Faulted(FaultKind::Cancelled));
        return outcome;
    }

    progress.on_start(asset, index, total);

    let raw = match source.fetch(asset, start, end) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%asset, error = %e, "fetch failed");
            progress.on_complete(asset, index, total, AssetStatus::Faulted(FaultKind::Fetch));
            return AssetOutcome::faulted(asset, AssetFault::fetch(asset, &e));
        }
    };

    let (prices, report) = match normalize_with_report(asset, &raw, start, end) {
        Ok(normalized) => normalized,
        Err(e) => {
            warn!(%asset, error = %e, "normalization failed");
            progress.on_complete(
                asset,
                index,
                total,
                AssetStatus::Faulted(FaultKind::DataIntegrity),
            );
            return AssetOutcome::faulted(asset, AssetFault::normalize(asset, &e));
        }
    };

    if report.dropped() > 0 {
        debug!(
            %asset,
            out_of_range = report.out_of_range,
            invalid_close = report.invalid_close,
            "dropped raw points"
        );
    }

    let returns = compute_returns(&prices);
    let row = summarize(asset, &returns, options.decimal_places);
    progress.on_complete(asset, index, total, AssetStatus::Completed { points: prices.len() });

    AssetOutcome {
        prices,
        returns,
        row,
        fault: None,
        report: Some(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use returnlab_core::data::SyntheticSource;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn inverted_range_aborts_before_fetch() {
        let err = aggregate_with_progress(
            &[AssetId::new("A")],
            &SyntheticSource::default(),
            d(2024, 2, 1),
            d(2024, 1, 1),
            &AggregateOptions::default(),
            &NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyRange { .. }));
    }

    #[test]
    fn empty_asset_list_gives_empty_table() {
        let run = aggregate_with_progress(
            &[],
            &SyntheticSource::default(),
            d(2024, 1, 1),
            d(2024, 1, 31),
            &AggregateOptions::default(),
            &NoProgress,
        )
        .unwrap();
        assert!(run.summary.is_empty());
        assert!(run.all_succeeded());
    }

    #[test]
    fn pre_cancelled_run_still_emits_every_row() {
        let options = AggregateOptions::default();
        options.cancel.cancel();
        let assets: Vec<AssetId> = vec!["A".into(), "B".into()];
        let run = aggregate_with_progress(
            &assets,
            &SyntheticSource::default(),
            d(2024, 1, 1),
            d(2024, 1, 31),
            &options,
            &NoProgress,
        )
        .unwrap();
        assert_eq!(run.summary.len(), 2);
        assert_eq!(run.summary.no_data_count(), 2);
        assert!(run.faults.iter().all(|f| f.kind == FaultKind::Cancelled));
    }

    #[test]
    fn gaps_are_reported_as_warnings() {
        let source = SyntheticSource::new(5).with_gap_probability(1.0);
        let run = aggregate_with_progress(
            &[AssetId::new("BTC-USD")],
            &source,
            d(2024, 1, 1),
            d(2024, 1, 10),
            &AggregateOptions::default(),
            &NoProgress,
        )
        .unwrap();
        assert!(run.all_succeeded());
        assert_eq!(run.warnings.len(), 2);
        assert!(run.warnings[0].contains("dropped 10 of 10"));
        assert!(!run.summary.rows()[0].has_data());
    }

    #[test]
    fn fault_display_names_asset_and_kind() {
        let fault = AssetFault::cancelled(&"ETH-USD".into());
        assert!(fault.to_string().starts_with("ETH-USD (cancelled):"));
    }
}
