//! Standalone SVG line chart of an asset's closing prices.
//!
//! Hand-built SVG: one polyline of closes over evenly spaced dates, a
//! monthly time axis, min/max price labels, and a title. An empty series
//! renders a frame with a "no data" note so every charted asset still gets
//! a file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Datelike;
use returnlab_core::{AssetId, PriceSeries};

const WIDTH: i32 = 720;
const HEIGHT: i32 = 400;
const PADDING: f64 = 48.0;
const LINE_COLOR: &str = "#348dc1";

/// File name of an asset's chart.
pub fn chart_file_name(asset: &AssetId) -> String {
    format!("{}_chart.svg", asset.file_stem())
}

fn svg_header(width: i32, height: i32) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}.title{{font-size:14px;fill:#222}}</style><rect width="100%" height="100%" fill="#fff" />"##
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn x_positions(len: usize, width: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![width / 2.0],
        _ => {
            let inner = width - 2.0 * PADDING;
            (0..len)
                .map(|i| PADDING + inner * (i as f64 / (len - 1) as f64))
                .collect()
        }
    }
}

fn y_positions(values: &[f64], min: f64, max: f64, height: f64) -> Vec<f64> {
    if min == max {
        return vec![height / 2.0; values.len()];
    }
    let inner = height - 2.0 * PADDING;
    values
        .iter()
        .map(|v| PADDING + (1.0 - (v - min) / (max - min)) * inner)
        .collect()
}

fn add_time_axis(svg: &mut String, series: &PriceSeries, xs: &[f64], width: f64, height: f64) {
    let axis_y = height - PADDING;
    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{axis_y:.2}" x2="{x2:.2}" y2="{axis_y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = PADDING,
        x2 = width - PADDING,
    ));

    // Label every Nth month so long ranges stay readable.
    let months = series
        .first()
        .zip(series.last())
        .map(|(a, b)| (b.date.year() - a.date.year()) * 12 + b.date.month() as i32 - a.date.month() as i32 + 1)
        .unwrap_or(0);
    let step = (months / 12).max(1) as u32;

    let mut last_month: Option<(i32, u32)> = None;
    for (point, x) in series.iter().zip(xs) {
        let key = (point.date.year(), point.date.month());
        if last_month == Some(key) {
            continue;
        }
        last_month = Some(key);
        if (point.date.month() - 1) % step != 0 {
            continue;
        }

        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{axis_y:.2}" stroke="#eeeeee" stroke-width="0.5" />"##,
            y1 = PADDING,
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = axis_y + 14.0,
            label = point.date.format("%Y-%m"),
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">Date</text>"#,
        x = width / 2.0,
        y = height - 10.0,
    ));
}

/// Render `series` as a closing-price line chart.
pub fn render_price_chart(asset: &AssetId, series: &PriceSeries) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;

    let mut svg = svg_header(WIDTH, HEIGHT);
    svg.push_str(&format!(
        r#"<text class="title" x="{x:.2}" y="24" text-anchor="middle">{title}</text>"#,
        x = width / 2.0,
        title = escape(&format!("{asset} Closing Price Over Time")),
    ));
    svg.push_str(&format!(
        r#"<text x="14" y="{y:.2}" text-anchor="middle" transform="rotate(-90 14 {y:.2})">Close Price</text>"#,
        y = height / 2.0,
    ));

    if series.is_empty() {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">no data</text>"#,
            x = width / 2.0,
            y = height / 2.0,
        ));
        svg.push_str("</svg>");
        return svg;
    }

    let closes: Vec<f64> = series.closes().collect();
    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let xs = x_positions(closes.len(), width);
    let ys = y_positions(&closes, min, max, height);

    for (value, y) in [(max, PADDING), (min, height - PADDING)] {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{value:.2}</text>"#,
            x = PADDING - 4.0,
        ));
    }

    add_time_axis(&mut svg, series, &xs, width, height);

    let coords = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ");
    svg.push_str(&format!(
        r#"<polyline fill="none" stroke="{LINE_COLOR}" stroke-width="1.5" points="{coords}" />"#
    ));

    svg.push_str("</svg>");
    svg
}

pub fn write_price_chart(path: &Path, asset: &AssetId, series: &PriceSeries) -> Result<()> {
    fs::write(path, render_price_chart(asset, series))
        .with_context(|| format!("failed to write chart {}", path.display()))
}
