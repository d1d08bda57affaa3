//! Series normalizer: raw provider points → canonical [`PriceSeries`].
//!
//! Steps, in order:
//! 1. Reject an inverted date range (configuration fault).
//! 2. Keep only points inside the closed range `[start, end]`.
//! 3. Sort by date and reject duplicate dates (provider integrity fault).
//! 4. Drop points whose close is missing, non-finite, or negative.
//!
//! Gaps are never filled: a dropped or absent date is simply not in the
//! output. Zero input points is a valid input and yields an empty series.

use crate::data::RawPricePoint;
use crate::domain::{AssetId, PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("empty date range: start {start} is after end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("provider returned more than one point for {asset} on {date}")]
    DuplicateDate { asset: AssetId, date: NaiveDate },
}

/// What the normalizer discarded, for data-quality reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Points the provider sent in total.
    pub received: usize,
    /// Points dated outside `[start, end]`.
    pub out_of_range: usize,
    /// In-range points with a missing, non-finite, or negative close.
    pub invalid_close: usize,
    /// Points kept in the canonical series.
    pub kept: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.out_of_range + self.invalid_close
    }
}

/// Check that `[start, end]` is a usable range.
pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), NormalizeError> {
    if start > end {
        return Err(NormalizeError::EmptyRange { start, end });
    }
    Ok(())
}

/// Normalize raw provider points into a canonical price series.
pub fn normalize(
    asset: &AssetId,
    raw_points: &[RawPricePoint],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, NormalizeError> {
    normalize_with_report(asset, raw_points, start, end).map(|(series, _)| series)
}

/// [`normalize`], also returning counts of what was dropped and why.
pub fn normalize_with_report(
    asset: &AssetId,
    raw_points: &[RawPricePoint],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(PriceSeries, NormalizeReport), NormalizeError> {
    check_range(start, end)?;

    let mut report = NormalizeReport {
        received: raw_points.len(),
        ..NormalizeReport::default()
    };

    let mut in_range: Vec<&RawPricePoint> = raw_points
        .iter()
        .filter(|p| p.date >= start && p.date <= end)
        .collect();
    report.out_of_range = raw_points.len() - in_range.len();

    in_range.sort_by_key(|p| p.date);
    if let Some(w) = in_range.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(NormalizeError::DuplicateDate {
            asset: asset.clone(),
            date: w[1].date,
        });
    }

    let points: Vec<PricePoint> = in_range
        .iter()
        .filter_map(|p| match p.close {
            Some(close) if close.is_finite() && close >= 0.0 => Some(PricePoint::new(p.date, close)),
            _ => None,
        })
        .collect();
    report.invalid_close = in_range.len() - points.len();
    report.kept = points.len();

    Ok((PriceSeries::from_canonical(points), report))
}
