//! Domain types for ReturnLab

pub mod asset;
pub mod series;

pub use asset::{AssetClass, AssetId};
pub use series::{DailyReturn, PricePoint, PriceSeries, ReturnPoint, ReturnSeries, SeriesError};
