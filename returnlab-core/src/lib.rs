//! ReturnLab Core — asset domain types, market data sources, normalization, returns.
//!
//! This crate contains the pure heart of the daily-return pipeline:
//! - Domain types (asset ids, canonical price series, tagged daily returns)
//! - The `MarketDataSource` seam with Yahoo Finance and synthetic implementations
//! - The series normalizer (range filter, close validation, duplicate detection)
//! - The return calculator with an explicit `Undefined` marker
//! - Round-half-to-even rounding used by the summary statistics

pub mod data;
pub mod domain;
pub mod normalize;
pub mod returns;
pub mod rounding;

pub use data::{FetchError, MarketDataSource, RawPricePoint};
pub use domain::{
    AssetClass, AssetId, DailyReturn, PricePoint, PriceSeries, ReturnPoint, ReturnSeries, SeriesError,
};
pub use normalize::{check_range, normalize, normalize_with_report, NormalizeError, NormalizeReport};
pub use returns::{compute_returns, pct_change};
pub use rounding::round_half_even;
