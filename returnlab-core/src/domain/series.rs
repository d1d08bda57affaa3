//! Canonical per-asset time series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One canonical observation: a trading date and its close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates not strictly increasing at {date}")]
    NotIncreasing { date: NaiveDate },

    #[error("close {close} on {date} is not a finite, non-negative price")]
    InvalidClose { date: NaiveDate, close: f64 },
}

/// Ordered `(date, close)` sequence for one asset.
///
/// Invariants: dates strictly increasing, every close finite and `>= 0`.
/// An empty series is valid and means the provider had nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from points that must already satisfy the invariants.
    pub fn try_new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close < 0.0 {
                return Err(SeriesError::InvalidClose {
                    date: p.date,
                    close: p.close,
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(SeriesError::NotIncreasing { date: p.date });
            }
        }
        Ok(Self { points })
    }

    /// Callers guarantee the invariants (the normalizer checks them itself).
    pub(crate) fn from_canonical(points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Daily percentage return for one date.
///
/// `Undefined` is distinct from zero: it marks the first date of a series
/// (no prior close) and any date whose prior close was zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DailyReturn {
    Undefined,
    Percent(f64),
}

impl DailyReturn {
    /// Wrap a computed value, demoting NaN and infinities to `Undefined`.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            DailyReturn::Percent(value)
        } else {
            DailyReturn::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            DailyReturn::Percent(v) => Some(v),
            DailyReturn::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, DailyReturn::Percent(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: DailyReturn,
}

/// Daily returns aligned 1:1 with a [`PriceSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub(crate) fn from_points(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Defined return values in date order; `Undefined` slots are skipped.
    pub fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.value.value())
    }

    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_defined()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReturnPoint> {
        self.points.iter()
    }
}
