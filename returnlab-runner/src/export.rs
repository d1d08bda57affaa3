//! CSV and Parquet export of price/return series and the summary table.
//!
//! - **Series CSV**: `Date,Close,DailyReturnPercent`, one row per price point,
//!   blank return for `Undefined`
//! - **Summary CSV**: `Asset,AverageDailyReturn,MaxDailyReturn`, blank cells
//!   for `NoData`
//! - **Parquet**: same columns as the series CSV, nulls for `Undefined`
//!
//! Floats are written with shortest round-trip formatting, so reading a
//! series CSV back reconstructs the exact `(date, close)` pairs.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType, ParquetWriter};
use returnlab_core::{PriceSeries, ReturnSeries};
use serde::Deserialize;

use crate::summary::{Statistic, SummaryTable};

pub const SERIES_HEADER: [&str; 3] = ["Date", "Close", "DailyReturnPercent"];
pub const SUMMARY_HEADER: [&str; 3] = ["Asset", "AverageDailyReturn", "MaxDailyReturn"];

/// One parsed row of a series CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
    #[serde(rename = "DailyReturnPercent")]
    pub daily_return: Option<f64>,
}

fn check_aligned(prices: &PriceSeries, returns: &ReturnSeries) -> Result<()> {
    if prices.len() != returns.len() {
        bail!(
            "price and return series are misaligned ({} prices, {} returns)",
            prices.len(),
            returns.len()
        );
    }
    Ok(())
}

fn stat_cell(stat: Statistic) -> String {
    stat.value().map(|v| v.to_string()).unwrap_or_default()
}

// ─── Series CSV ─────────────────────────────────────────────────────

/// Render one asset's prices and returns as CSV.
pub fn export_series_csv(prices: &PriceSeries, returns: &ReturnSeries) -> Result<String> {
    check_aligned(prices, returns)?;

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SERIES_HEADER)?;
    for (p, r) in prices.iter().zip(returns.iter()) {
        wtr.write_record([
            p.date.to_string(),
            p.close.to_string(),
            r.value.value().map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Parse a series CSV produced by [`export_series_csv`].
pub fn parse_series_csv(content: &str) -> Result<Vec<SeriesRecord>> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());

    let headers = rdr.headers().context("failed to read CSV header")?.clone();
    for col in ["Date", "Close"] {
        if !headers.iter().any(|h| h == col) {
            bail!("series CSV is missing column '{col}'");
        }
    }

    rdr.deserialize()
        .enumerate()
        .map(|(i, rec)| rec.with_context(|| format!("bad series CSV row {}", i + 2)))
        .collect()
}

/// Read and parse a series CSV file.
pub fn read_series_csv(path: &Path) -> Result<Vec<SeriesRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_series_csv(&content)
}

pub fn write_series_csv(path: &Path, prices: &PriceSeries, returns: &ReturnSeries) -> Result<()> {
    let csv = export_series_csv(prices, returns)?;
    fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Summary CSV ────────────────────────────────────────────────────

/// Render the summary table as CSV in row order.
pub fn export_summary_csv(summary: &SummaryTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SUMMARY_HEADER)?;
    for row in summary.rows() {
        wtr.write_record([
            row.asset.to_string(),
            stat_cell(row.average_daily_return),
            stat_cell(row.max_daily_return),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_summary_csv(path: &Path, summary: &SummaryTable) -> Result<()> {
    let csv = export_summary_csv(summary)?;
    fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Parquet ────────────────────────────────────────────────────────

/// Build a DataFrame with the series CSV columns.
pub fn series_to_dataframe(prices: &PriceSeries, returns: &ReturnSeries) -> Result<DataFrame> {
    check_aligned(prices, returns)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid epoch date")?;
    let dates: Vec<i32> = prices
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let closes: Vec<f64> = prices.closes().collect();
    let daily: Vec<Option<f64>> = returns.iter().map(|r| r.value.value()).collect();

    DataFrame::new(vec![
        Column::new("Date".into(), dates)
            .cast(&DataType::Date)
            .context("date cast")?,
        Column::new("Close".into(), closes),
        Column::new("DailyReturnPercent".into(), daily),
    ])
    .context("dataframe creation")
}

pub fn write_series_parquet(
    path: &Path,
    prices: &PriceSeries,
    returns: &ReturnSeries,
) -> Result<()> {
    let mut df = series_to_dataframe(prices, returns)?;
    let file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write parquet {}", path.display()))?;
    Ok(())
}
