//! Market data acquisition

pub mod circuit_breaker;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use provider::{FetchError, MarketDataSource, RawPricePoint};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooSource;
