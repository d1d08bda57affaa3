//! Fixed-width console rendering of series previews, the summary table, and
//! fault/warning lists.
//!
//! Functions return `String`s; the CLI decides where they go.

use std::fmt::Write;

use returnlab_core::{AssetId, DailyReturn, PriceSeries, ReturnSeries};

use crate::pipeline::{AssetFault, PortfolioRun};
use crate::summary::SummaryTable;

const UNDEFINED: &str = "n/a";

fn daily_return_cell(value: DailyReturn) -> String {
    match value {
        DailyReturn::Percent(v) => format!("{v:.4}"),
        DailyReturn::Undefined => UNDEFINED.to_string(),
    }
}

/// First `rows` points of one asset's prices and returns.
pub fn format_series_preview(
    asset: &AssetId,
    prices: &PriceSeries,
    returns: &ReturnSeries,
    rows: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{asset} data preview:");

    if prices.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return out;
    }

    let _ = writeln!(out, "{:<12} {:>14} {:>14}", "Date", "Close", "DailyReturn%");
    let _ = writeln!(out, "{}", "-".repeat(42));
    for (p, r) in prices.iter().zip(returns.iter()).take(rows) {
        let _ = writeln!(
            out,
            "{:<12} {:>14.4} {:>14}",
            p.date.to_string(),
            p.close,
            daily_return_cell(r.value)
        );
    }
    if prices.len() > rows {
        let _ = writeln!(out, "... {} more rows", prices.len() - rows);
    }
    out
}

/// The summary table, one line per asset in table order.
pub fn format_summary_table(summary: &SummaryTable, decimal_places: u32) -> String {
    let width = summary
        .assets()
        .map(|a| a.as_str().len())
        .max()
        .unwrap_or(0)
        .max("Asset".len());

    let mut out = String::new();
    let _ = writeln!(out, "Summary of all assets:");
    let _ = writeln!(
        out,
        "{:<width$} {:>22} {:>18}",
        "Asset", "Average Daily Return", "Max Daily Return"
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 42));
    for row in summary.rows() {
        let _ = writeln!(
            out,
            "{:<width$} {:>22} {:>18}",
            row.asset.as_str(),
            row.average_daily_return.display(decimal_places),
            row.max_daily_return.display(decimal_places)
        );
    }
    out
}

pub fn format_faults(faults: &[AssetFault]) -> String {
    let mut out = String::new();
    if faults.is_empty() {
        return out;
    }
    let _ = writeln!(out, "Faulted assets ({}):", faults.len());
    for fault in faults {
        let _ = writeln!(out, "  {fault}");
    }
    out
}

/// Full console report for a run: series previews, summary, faults, warnings.
pub fn format_run(run: &PortfolioRun, preview_rows: usize) -> String {
    let mut out = String::new();
    for (asset, prices, returns) in run.ordered() {
        out.push_str(&format_series_preview(asset, prices, returns, preview_rows));
        out.push('\n');
    }
    out.push_str(&format_summary_table(&run.summary, run.decimal_places));

    let faults = format_faults(&run.faults);
    if !faults.is_empty() {
        out.push('\n');
        out.push_str(&faults);
    }
    for warning in &run.warnings {
        let _ = writeln!(out, "WARNING: {warning}");
    }
    out
}
