//! Criterion benchmarks for the per-asset hot path.
//!
//! Benchmarks:
//! 1. Normalize (range filter, sort, duplicate check, close validation)
//! 2. Daily return computation
//! 3. Normalize + returns on shuffled provider output

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use returnlab_core::data::RawPricePoint;
use returnlab_core::{compute_returns, normalize, AssetId};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_raw_points(n: usize) -> Vec<RawPricePoint> {
    let base_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    base_date
        .iter_days()
        .take(n)
        .enumerate()
        .map(|(i, date)| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            // Every 50th day is a provider gap.
            let close = if i % 50 == 49 { None } else { Some(close) };
            RawPricePoint::close_only(date, close)
        })
        .collect()
}

fn range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
    )
}

// ── 1. Normalize ─────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let asset = AssetId::new("BTC-USD");
    let (start, end) = range();

    for n in [252usize, 1095, 3650] {
        let raw = make_raw_points(n);
        group.bench_with_input(BenchmarkId::new("sorted", n), &raw, |b, raw| {
            b.iter(|| normalize(black_box(&asset), black_box(raw), start, end))
        });
    }

    group.finish();
}

// ── 2. Returns ───────────────────────────────────────────────────────

fn bench_returns(c: &mut Criterion) {
    let mut group = c.benchmark_group("returns");
    let asset = AssetId::new("BTC-USD");
    let (start, end) = range();

    for n in [252usize, 1095, 3650] {
        let series = normalize(&asset, &make_raw_points(n), start, end).unwrap();
        group.bench_with_input(BenchmarkId::new("compute", n), &series, |b, series| {
            b.iter(|| compute_returns(black_box(series)))
        });
    }

    group.finish();
}

// ── 3. Combined ──────────────────────────────────────────────────────

fn bench_combined(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_and_returns");
    let asset = AssetId::new("AAPL");
    let (start, end) = range();

    let mut raw = make_raw_points(1095);
    raw.reverse();

    group.bench_function("reversed_1095_days", |b| {
        b.iter(|| {
            let series = normalize(&asset, black_box(&raw), start, end).unwrap();
            compute_returns(&series)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_returns, bench_combined);
criterion_main!(benches);
