//! Cross-asset summary statistics.
//!
//! Every statistic is a pure function of one asset's return series. The
//! table is assembled by position: one slot per configured asset, filled
//! once, so row order is the configured order no matter which asset
//! finished first.

use returnlab_core::{round_half_even, AssetId, ReturnSeries};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reported statistic, or an explicit "no data" marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Statistic {
    NoData,
    Value(f64),
}

impl Statistic {
    /// Wrap a value, demoting NaN and infinities to `NoData`.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Statistic::Value(value)
        } else {
            Statistic::NoData
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(v),
            Statistic::NoData => None,
        }
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Statistic::NoData)
    }

    /// Fixed-point rendering with `decimal_places`, or `"no data"`.
    pub fn display(self, decimal_places: u32) -> String {
        match self {
            Statistic::Value(v) => format!("{v:.prec$}", prec = decimal_places as usize),
            Statistic::NoData => "no data".to_string(),
        }
    }
}

impl From<Option<f64>> for Statistic {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Statistic::NoData, Statistic::from_value)
    }
}

impl From<Statistic> for Option<f64> {
    fn from(s: Statistic) -> Self {
        s.value()
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Value(v) => write!(f, "{v}"),
            Statistic::NoData => write!(f, "no data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub asset: AssetId,
    pub average_daily_return: Statistic,
    pub max_daily_return: Statistic,
    /// Number of defined daily returns the statistics were computed over.
    pub observations: usize,
}

impl SummaryRow {
    pub fn no_data(asset: AssetId) -> Self {
        Self {
            asset,
            average_daily_return: Statistic::NoData,
            max_daily_return: Statistic::NoData,
            observations: 0,
        }
    }

    /// True when at least one defined return went into the statistics.
    pub fn has_data(&self) -> bool {
        self.observations > 0
    }
}

/// Mean and max of the defined returns, each rounded half-to-even.
///
/// `Undefined` slots are excluded. With zero defined returns both
/// statistics are `NoData`.
pub fn summarize(asset: &AssetId, returns: &ReturnSeries, decimal_places: u32) -> SummaryRow {
    let mut count = 0usize;
    let mut mean = 0.0;
    let mut max: Option<f64> = None;

    // Running mean: each step is a convex combination of finite values, so
    // it stays finite even when a plain sum would overflow.
    for v in returns.defined() {
        count += 1;
        let n = count as f64;
        mean = mean - mean / n + v / n;
        max = Some(max.map_or(v, |m| m.max(v)));
    }

    let Some(max) = max else {
        return SummaryRow::no_data(asset.clone());
    };

    SummaryRow {
        asset: asset.clone(),
        average_daily_return: Statistic::from_value(round_half_even(mean, decimal_places)),
        max_daily_return: Statistic::from_value(round_half_even(max, decimal_places)),
        observations: count,
    }
}

/// Ordered summary: one row per configured asset, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, asset: &AssetId) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| &r.asset == asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.rows.iter().map(|r| &r.asset)
    }

    pub fn no_data_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.has_data()).count()
    }
}

/// Builds a [`SummaryTable`] slot by slot.
///
/// Slots are keyed by asset position; any slot never filled becomes a
/// `NoData` row on [`finish`](Self::finish), so no asset can go missing.
#[derive(Debug)]
pub struct SummaryTableBuilder {
    assets: Vec<AssetId>,
    slots: Vec<Option<SummaryRow>>,
}

impl SummaryTableBuilder {
    pub fn new(assets: &[AssetId]) -> Self {
        Self {
            assets: assets.to_vec(),
            slots: vec![None; assets.len()],
        }
    }

    /// Fill slot `index`. Returns `false` if the index is out of range.
    pub fn set(&mut self, index: usize, row: SummaryRow) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(row);
                true
            }
            None => false,
        }
    }

    pub fn finish(self) -> SummaryTable {
        let rows = self
            .assets
            .into_iter()
            .zip(self.slots)
            .map(|(asset, slot)| slot.unwrap_or_else(|| SummaryRow::no_data(asset)))
            .collect();
        SummaryTable { rows }
    }
}
