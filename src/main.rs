//! `shapefinder` command-line driver
//!
//! Scans every CSV file in a directory for one chart pattern, then
//! aggregates what happened after each match.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;

use shapefinder::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "shapefinder")]
#[command(version, about = "Search price series for chart patterns and aggregate their aftermath", long_about = None)]
struct Cli {
    /// Directory of <SYMBOL>.csv files
    #[arg(short, long)]
    data: PathBuf,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pattern to search for (e.g. SYM_TRIANGLE_BEAR, rise-wedge)
    #[arg(short, long)]
    pattern: Option<NamedPattern>,

    /// Half-width of the acceptance band
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Comma-separated scales, e.g. 20,30,40
    #[arg(short, long, value_delimiter = ',')]
    scales: Option<Vec<usize>>,

    /// Pattern segments to record after each match
    #[arg(long)]
    steps: Option<usize>,

    /// Value column to read from each CSV
    #[arg(long)]
    column: Option<String>,

    /// Timestamp column to read from each CSV
    #[arg(long)]
    time_column: Option<String>,

    /// Search raw prices instead of their logs
    #[arg(long)]
    raw: bool,

    /// Write the aggregate view as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Everything the binary reads from `--config`
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
struct AppConfig {
    #[serde(flatten)]
    engine: EngineConfig,
    time_column: String,
    value_column: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            time_column: CsvDirectoryStore::DEFAULT_TIME_COLUMN.to_string(),
            value_column: CsvDirectoryStore::DEFAULT_VALUE_COLUMN.to_string(),
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    let config = serde_json::from_reader(file).with_context(|| format!("parsing config {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn build_engine(cli: &Cli, config: EngineConfig) -> anyhow::Result<SearchEngine> {
    let mut builder = EngineBuilder::from_config(config);
    if let Some(pattern) = cli.pattern {
        builder = builder.named_pattern(pattern);
    }
    if let Some(tolerance) = cli.tolerance {
        builder = builder.tolerance(tolerance);
    }
    if let Some(scales) = &cli.scales {
        builder = builder.scales(scales.iter().copied());
    }
    if let Some(steps) = cli.steps {
        builder = builder.scaled_steps(steps);
    }
    if cli.raw {
        builder = builder.log_pattern(false).log_prices(false);
    }
    builder.build().context("invalid search configuration")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let engine = build_engine(&cli, config.engine)?;

    let store = CsvDirectoryStore::open(&cli.data)?
        .time_column(cli.time_column.clone().unwrap_or(config.time_column))
        .value_column(cli.column.clone().unwrap_or(config.value_column));

    let symbols: Vec<String> = store.list().into_iter().collect();
    if symbols.is_empty() {
        bail!("no CSV files in {}", cli.data.display());
    }

    let c = engine.config();
    log::info!(
        "searching {} symbols for {} (tolerance {}, scales {:?})",
        symbols.len(),
        engine.pattern().name(),
        c.tolerance.get(),
        c.scales.iter().map(|s| s.get()).collect::<Vec<_>>()
    );

    let started = Instant::now();
    let (results, errors) = scan_parallel(&engine, &store, symbols);
    log::info!(
        "scanned {} symbols in {:.2?} ({} failed)",
        results.len() + errors.len(),
        started.elapsed(),
        errors.len()
    );

    let mut aggregator = engine.aggregator()?;
    let mut total_matches = 0;
    for result in &results {
        let kept: usize = result.report.outcomes.iter().map(|o| o.matches.len()).sum();
        if kept > 0 {
            log::info!("{}: {} matches ({} after dedup)", result.symbol, result.report.matches.len(), kept);
        }
        total_matches += kept;
        aggregator.extend_report(&result.symbol, &result.report)?;
    }

    let view = aggregator.finish(engine.pattern(), c.tolerance)?;

    println!("pattern:     {}", engine.pattern().name());
    println!("symbols:     {} ok, {} failed", results.len(), errors.len());
    println!("matches:     {}", total_matches);
    println!("aftermaths:  {} (plot scale {})", view.rows.len(), view.plot_scale);
    match view.average.last().copied().flatten() {
        Some(avg) => println!("final avg:   {:+.5}", avg),
        None => println!("final avg:   n/a"),
    }

    if let Some(path) = &cli.output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &view)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote aggregate view to {}", path.display());
    }

    Ok(())
}
