//! Config-driven entry point: pick the source, run the aggregator.

use std::sync::Arc;

use returnlab_core::data::{CircuitBreaker, SyntheticSource, YahooSource};
use returnlab_core::{FetchError, MarketDataSource};
use tracing::info;

use crate::config::{PipelineConfig, RunSection, SourceKind};
use crate::import::CsvSource;
use crate::pipeline::{
    aggregate_with_progress, AggregateOptions, CancelToken, PipelineError, PipelineProgress,
    PortfolioRun,
};

/// Instantiate the market data source a run section asks for.
pub fn build_source(run: &RunSection) -> Result<Box<dyn MarketDataSource>, FetchError> {
    let source: Box<dyn MarketDataSource> = match run.source {
        SourceKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooSource::new(breaker)?)
        }
        SourceKind::Synthetic => Box::new(SyntheticSource::new(run.seed)),
        SourceKind::Csv => {
            let dir = run.csv_dir.clone().ok_or_else(|| {
                FetchError::Other("csv source selected without a csv_dir".into())
            })?;
            Box::new(CsvSource::new(dir))
        }
    };
    Ok(source)
}

pub fn options_from_config(config: &PipelineConfig, cancel: CancelToken) -> AggregateOptions {
    AggregateOptions {
        decimal_places: config.output.precision,
        workers: config.run.workers,
        cancel,
    }
}

/// Run the pipeline described by `config`.
pub fn run_from_config(
    config: &PipelineConfig,
    cancel: CancelToken,
    progress: &dyn PipelineProgress,
) -> Result<PortfolioRun, PipelineError> {
    let source = build_source(&config.run)?;
    info!(source = source.name(), "market data source ready");
    aggregate_with_progress(
        &config.run.assets,
        source.as_ref(),
        config.run.start_date,
        config.run.end_date,
        &options_from_config(config, cancel),
        progress,
    )
}
