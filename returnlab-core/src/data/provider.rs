//! Market data source trait and structured fetch errors.
//!
//! The `MarketDataSource` trait abstracts over where daily prices come from
//! (Yahoo Finance, a synthetic random walk, previously exported CSV files)
//! so the pipeline can swap implementations and tests can inject mocks.
//! Sources are untrusted: nothing they return is assumed to be sorted,
//! complete, or internally consistent.

use crate::domain::AssetId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One provider-supplied daily observation, before any validation.
///
/// Every price field is optional because providers report holidays and
/// halted sessions as nulls. Only `close` is consumed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawPricePoint {
    /// A point carrying only a close, as produced by close-only sources.
    pub fn close_only(date: NaiveDate, close: Option<f64>) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// True when every OHLCV field is missing.
    pub fn is_blank(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }
}

/// Structured errors from a single fetch.
///
/// Every variant is a per-asset condition: the aggregator records it as a
/// fault and keeps going with the remaining assets.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("i/o error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("fetch error: {0}")]
    Other(String),
}

impl FetchError {
    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::NetworkUnreachable(_)
                | FetchError::RateLimited { .. }
                | FetchError::CircuitBreakerTripped
        )
    }
}

/// A provider of daily price history.
///
/// Implementations handle the specifics of one source. An empty `Vec` is a
/// valid answer (no trading history in range) and must not be turned into an
/// error.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch raw daily points for an asset over `[start, end]`.
    fn fetch(
        &self,
        asset: &AssetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError>;

    /// Whether the source currently accepts requests (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: MarketDataSource + ?Sized> MarketDataSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        asset: &AssetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        (**self).fetch(asset, start, end)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
