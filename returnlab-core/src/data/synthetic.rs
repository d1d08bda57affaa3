//! Synthetic market data for offline runs and demos.
//!
//! Produces a deterministic random walk per asset: the RNG is seeded from a
//! BLAKE3 hash of the asset id and the run seed, so the same configuration
//! always yields the same prices. Equities skip weekends, crypto pairs trade
//! every calendar day. Optional gap injection emits points with a null close
//! so the normalizer's gap handling gets exercised.

use super::provider::{FetchError, MarketDataSource, RawPricePoint};
use crate::domain::{AssetClass, AssetId};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    start_price: f64,
    max_daily_move: f64,
    gap_probability: f64,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            seed: 0,
            start_price: 100.0,
            max_daily_move: 0.03,
            gap_probability: 0.0,
        }
    }
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_start_price(mut self, start_price: f64) -> Self {
        self.start_price = start_price;
        self
    }

    /// Largest absolute fractional move per day (0.03 = ±3%).
    pub fn with_max_daily_move(mut self, max_daily_move: f64) -> Self {
        self.max_daily_move = max_daily_move.abs();
        self
    }

    /// Probability in `[0, 1]` that a day is reported with a null close.
    pub fn with_gap_probability(mut self, gap_probability: f64) -> Self {
        self.gap_probability = gap_probability.clamp(0.0, 1.0);
        self
    }

    fn rng_for(&self, asset: &AssetId) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(asset.as_str().as_bytes());
        hasher.update(&self.seed.to_le_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    fn generate(&self, asset: &AssetId, start: NaiveDate, end: NaiveDate) -> Vec<RawPricePoint> {
        let mut rng = self.rng_for(asset);
        let weekends = AssetClass::infer(asset).trades_weekends();

        let mut points = Vec::new();
        let mut price = self.start_price;

        for date in start.iter_days().take_while(|d| *d <= end) {
            if !weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = if self.max_daily_move > 0.0 {
                rng.gen_range(-self.max_daily_move..self.max_daily_move)
            } else {
                0.0
            };
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);
            let gap = self.gap_probability > 0.0 && rng.gen_bool(self.gap_probability);

            points.push(RawPricePoint {
                date,
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: if gap { None } else { Some(close) },
                volume: Some(volume),
            });

            price = close;
        }

        points
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        asset: &AssetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        Ok(self.generate(asset, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn deterministic_per_asset_and_seed() {
        let source = SyntheticSource::new(7);
        let a = source.fetch(&"AAPL".into(), d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let b = source.fetch(&"AAPL".into(), d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        assert_eq!(a, b);

        let other = source.fetch(&"MSFT".into(), d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        assert_ne!(a, other);

        let reseeded = SyntheticSource::new(8)
            .fetch(&"AAPL".into(), d(2024, 1, 1), d(2024, 3, 31))
            .unwrap();
        assert_ne!(a, reseeded);
    }

    #[test]
    fn equities_skip_weekends() {
        // 2024-01-01 is a Monday; two full weeks.
        let points = SyntheticSource::default()
            .fetch(&"AAPL".into(), d(2024, 1, 1), d(2024, 1, 14))
            .unwrap();
        assert_eq!(points.len(), 10);
        assert!(points
            .iter()
            .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn crypto_trades_every_day() {
        let points = SyntheticSource::default()
            .fetch(&"BTC-USD".into(), d(2024, 1, 1), d(2024, 1, 14))
            .unwrap();
        assert_eq!(points.len(), 14);
    }

    #[test]
    fn closes_stay_positive_and_bounded() {
        let points = SyntheticSource::new(1)
            .with_max_daily_move(0.05)
            .fetch(&"ETH-USD".into(), d(2023, 1, 1), d(2023, 12, 31))
            .unwrap();
        let closes: Vec<f64> = points.iter().filter_map(|p| p.close).collect();
        assert_eq!(closes.len(), 365);
        for w in closes.windows(2) {
            assert!(w[1] > 0.0);
            assert!(((w[1] - w[0]) / w[0]).abs() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn gap_injection_nulls_closes() {
        let points = SyntheticSource::new(3)
            .with_gap_probability(1.0)
            .fetch(&"BTC-USD".into(), d(2024, 1, 1), d(2024, 1, 10))
            .unwrap();
        assert_eq!(points.len(), 10);
        assert!(points.iter().all(|p| p.close.is_none()));
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let points = SyntheticSource::default()
            .fetch(&"AAPL".into(), d(2024, 2, 1), d(2024, 1, 1))
            .unwrap();
        assert!(points.is_empty());
    }
}
