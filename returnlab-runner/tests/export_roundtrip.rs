//! Artifact round trips through the filesystem.

use chrono::NaiveDate;
use polars::prelude::{ParquetReader, SerReader};
use returnlab_core::data::SyntheticSource;
use returnlab_core::AssetId;
use returnlab_runner::export::read_series_csv;
use returnlab_runner::{
    aggregate_with_progress, dataset_hash, save_run, AggregateOptions, ArtifactOptions, CsvSource,
    NoProgress, PipelineConfig, PortfolioRun, RunManifest, SCHEMA_VERSION,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn assets() -> Vec<AssetId> {
    vec!["AAPL".into(), "BTC-USD".into(), "ETH-USD".into()]
}

fn synthetic_run() -> PortfolioRun {
    aggregate_with_progress(
        &assets(),
        &SyntheticSource::new(9).with_gap_probability(0.1),
        d(2024, 1, 1),
        d(2024, 6, 30),
        &AggregateOptions::default(),
        &NoProgress,
    )
    .unwrap()
}

#[test]
fn save_run_writes_full_artifact_set() {
    let dir = tempfile::tempdir().unwrap();
    let run = synthetic_run();
    let options = ArtifactOptions {
        parquet: true,
        chart_assets: vec!["AAPL".into(), "NOT-IN-RUN".into()],
    };
    let config = PipelineConfig::default_dashboard();

    let paths = save_run(&run, dir.path(), &options, Some(&config)).unwrap();

    assert_eq!(paths.series_csv.len(), 3);
    assert_eq!(paths.series_parquet.len(), 3);
    assert_eq!(paths.charts.len(), 1);
    for path in paths.all() {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(dir.path().join("BTC-USD_data.csv").exists());
    assert!(dir.path().join("AAPL_chart.svg").exists());

    let manifest = RunManifest::load(&paths.manifest).unwrap();
    assert_eq!(manifest.schema_version, SCHEMA_VERSION);
    assert_eq!(manifest.assets, assets());
    assert_eq!(manifest.dataset_hash, dataset_hash(&run));
    assert_eq!(manifest.config, Some(config));

    let summary = std::fs::read_to_string(&paths.summary_csv).unwrap();
    let first_col: Vec<&str> = summary
        .lines()
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(first_col, vec!["Asset", "AAPL", "BTC-USD", "ETH-USD"]);
}

#[test]
fn series_csv_reconstructs_date_close_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let run = synthetic_run();
    let paths = save_run(&run, dir.path(), &ArtifactOptions::default(), None).unwrap();

    for (asset, path) in assets().iter().zip(&paths.series_csv) {
        let records = read_series_csv(path).unwrap();
        let parsed: Vec<(NaiveDate, f64)> =
            records.iter().map(|r| (r.date, r.close.unwrap())).collect();
        let original: Vec<(NaiveDate, f64)> = run
            .prices(asset)
            .unwrap()
            .iter()
            .map(|p| (p.date, p.close))
            .collect();
        assert_eq!(parsed, original, "{asset}");
    }
}

#[test]
fn rerun_from_exported_csv_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let run = synthetic_run();
    save_run(&run, dir.path(), &ArtifactOptions::default(), None).unwrap();

    let rerun = aggregate_with_progress(
        &assets(),
        &CsvSource::new(dir.path()),
        run.start,
        run.end,
        &AggregateOptions::default(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(rerun.source, "csv");
    assert_eq!(dataset_hash(&rerun), dataset_hash(&run));
    assert_eq!(rerun.summary, run.summary);
    assert!(rerun.all_succeeded());
}

#[test]
fn parquet_has_one_row_per_point() {
    let dir = tempfile::tempdir().unwrap();
    let run = synthetic_run();
    let options = ArtifactOptions {
        parquet: true,
        chart_assets: Vec::new(),
    };
    let paths = save_run(&run, dir.path(), &options, None).unwrap();

    for (asset, path) in assets().iter().zip(&paths.series_parquet) {
        let file = std::fs::File::open(path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), run.prices(asset).unwrap().len());
        assert_eq!(df.get_column_names().len(), 3);
        let nulls = df.column("DailyReturnPercent").unwrap().null_count();
        assert!(nulls >= 1, "first return is always undefined");
    }
}

#[test]
fn faulted_asset_still_gets_header_only_csv() {
    let dir = tempfile::tempdir().unwrap();
    let run = aggregate_with_progress(
        &[AssetId::new("MISSING")],
        &CsvSource::new(dir.path().join("nowhere")),
        d(2024, 1, 1),
        d(2024, 1, 31),
        &AggregateOptions::default(),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(run.faults.len(), 1);

    let out = dir.path().join("out");
    let paths = save_run(&run, &out, &ArtifactOptions::default(), None).unwrap();
    let csv = std::fs::read_to_string(&paths.series_csv[0]).unwrap();
    assert_eq!(csv.trim_end(), "Date,Close,DailyReturnPercent");
    let summary = std::fs::read_to_string(&paths.summary_csv).unwrap();
    assert!(summary.contains("MISSING,,"));
}
