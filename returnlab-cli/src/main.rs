//! ReturnLab CLI — run the daily-return pipeline and manage its config.
//!
//! Commands:
//! - `run`: fetch, normalize, compute returns, summarize, preview, export
//! - `config init`: write the default five-asset config as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use returnlab_core::AssetId;
use returnlab_runner::preview::format_run;
use returnlab_runner::{
    run_from_config, save_run, ArtifactOptions, CancelToken, LogProgress, PipelineConfig,
    SourceKind,
};

#[derive(Parser)]
#[command(
    name = "returnlab",
    about = "ReturnLab CLI — daily prices, returns, and a cross-asset summary"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a TOML config and/or flags.
    Run(RunArgs),
    /// Configuration file commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML config file. Without it the default dashboard is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Assets in output order (e.g., AAPL BTC-USD).
    #[arg(long, num_args = 1..)]
    assets: Option<Vec<String>>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Market data source: yahoo, synthetic, csv.
    #[arg(long)]
    source: Option<SourceKind>,

    /// Directory of `{asset}_data.csv` files for the csv source.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Seed for the synthetic source.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for per-asset processing.
    #[arg(long)]
    workers: Option<usize>,

    /// Rows shown per asset in the console preview.
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Decimal places for summary statistics.
    #[arg(long)]
    precision: Option<u32>,

    /// Output directory for CSVs, charts, and the manifest.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also write per-asset Parquet files.
    #[arg(long, default_value_t = false)]
    parquet: bool,

    /// Print only; write no files.
    #[arg(long, default_value_t = false)]
    no_export: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config as TOML.
    Init {
        /// Destination file.
        #[arg(long, default_value = "returnlab.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_cmd(args),
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => config_init(path, force),
        },
    }
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid {flag} date '{value}' (expected YYYY-MM-DD)"))
}

/// Start from the config file (or the default dashboard) and apply flag overrides.
fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default_dashboard(),
    };

    if let Some(assets) = &args.assets {
        config.run.assets = assets.iter().map(|a| AssetId::new(a.as_str())).collect();
    }
    if let Some(start) = &args.start {
        config.run.start_date = parse_date("--start", start)?;
    }
    if let Some(end) = &args.end {
        config.run.end_date = parse_date("--end", end)?;
    }
    if let Some(source) = args.source {
        config.run.source = source;
    }
    if let Some(dir) = &args.csv_dir {
        config.run.csv_dir = Some(dir.clone());
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(workers) = args.workers {
        config.run.workers = workers;
    }
    if let Some(rows) = args.preview_rows {
        config.output.preview_rows = rows;
    }
    if let Some(precision) = args.precision {
        config.output.precision = precision;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if args.parquet {
        config.output.parquet = true;
    }
    if args.no_export {
        config.output.export = false;
    }

    config.validate()?;
    Ok(config)
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    info!(
        assets = config.run.assets.len(),
        start = %config.run.start_date,
        end = %config.run.end_date,
        "configuration loaded"
    );

    let run = run_from_config(&config, CancelToken::new(), &LogProgress)?;

    println!();
    print!("{}", format_run(&run, config.output.preview_rows));

    if config.output.export {
        let options = ArtifactOptions::from_config(&config);
        let paths = save_run(&run, &config.output.dir, &options, Some(&config))?;
        println!();
        println!("Artifacts saved to: {}", paths.dir.display());
        for path in paths.all() {
            println!("  {}", path.display());
        }
    }

    if !run.all_succeeded() {
        warn!(
            faulted = run.faults.len(),
            total = run.assets.len(),
            "run completed with faulted assets"
        );
    }
    Ok(())
}

fn config_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    let toml = PipelineConfig::default_dashboard().to_toml()?;
    std::fs::write(&path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
