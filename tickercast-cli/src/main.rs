//! TickerCast CLI — catalog, download, forecast, and cache commands.
//!
//! Commands:
//! - `catalog` — list the symbols available for forecasting
//! - `download` — fetch price history from Yahoo Finance and cache as Parquet
//! - `forecast` — run the full pipeline for one symbol and save artifacts
//! - `cache status` — report cached symbols, row counts, and date ranges

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickercast_core::catalog::{CatalogCache, SymbolCatalog};
use tickercast_core::data::{CircuitBreaker, HistoryCache, YahooProvider};
use tickercast_core::forecast::SeasonalTrendModel;
use tickercast_core::{ProgressSink, StdoutProgress};
use tickercast_runner::{
    load_history, run_pipeline, save_artifacts, LoadOptions, PipelineReport, PipelineRequest,
    RunConfig,
};

#[derive(Parser)]
#[command(
    name = "tickercast",
    about = "TickerCast CLI — stock price history and forecasting pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the symbols available for forecasting.
    Catalog {
        /// Path to the catalog CSV (symbol,name columns).
        #[arg(long, default_value = "symbols.csv")]
        file: PathBuf,
    },
    /// Download price history from Yahoo Finance and cache it.
    Download {
        /// Symbols to download (e.g., RELIANCE.NS TCS.NS).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Run the full forecast pipeline for one symbol.
    Forecast {
        /// Catalog symbol to forecast.
        #[arg(long)]
        symbol: String,

        /// Forecast horizon in whole years.
        #[arg(long, default_value_t = 1)]
        years: u32,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Catalog CSV path (overrides the config).
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Cache directory (overrides the config).
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Output directory for artifacts (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Offline mode: no network access, cached data only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback when real data is unavailable.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, row counts, and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog { file } => run_catalog(&file),
        Commands::Download {
            symbols,
            start,
            end,
            force,
            cache_dir,
        } => run_download(symbols, start, end, force, cache_dir),
        Commands::Forecast {
            symbol,
            years,
            config,
            catalog,
            cache_dir,
            output_dir,
            offline,
            synthetic,
        } => run_forecast_cmd(
            symbol, years, config, catalog, cache_dir, output_dir, offline, synthetic,
        ),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn run_catalog(file: &Path) -> Result<()> {
    let catalog = SymbolCatalog::load(file)?;

    println!("Catalog: {}", file.display());
    println!("Symbols: {}", catalog.len());
    println!();
    println!("{:<16} {}", "Symbol", "Name");
    println!("{}", "-".repeat(48));
    for entry in catalog.entries() {
        println!("{:<16} {}", entry.symbol, entry.name);
    }

    Ok(())
}

fn run_download(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let end_date = parse_date_arg(end.as_deref())?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let start_date = parse_date_arg(start.as_deref())?
        .unwrap_or_else(|| end_date - chrono::Duration::days(365 * 5));

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);
    let cache = HistoryCache::new(cache_dir);
    let progress = StdoutProgress;

    let opts = LoadOptions {
        start: start_date,
        end: end_date,
        offline: false,
        synthetic: false,
        force,
    };

    let mut errors: Vec<(String, String)> = Vec::new();
    for symbol in &symbols {
        println!("Downloading {symbol} ({start_date} to {end_date})...");
        match load_history(symbol, &cache, Some(&provider), &opts, &progress) {
            Ok(loaded) => {
                println!("  {} rows cached (hash {})", loaded.records.len(), loaded.data_hash);
            }
            Err(e) => errors.push((symbol.clone(), e.to_string())),
        }
    }

    if !errors.is_empty() {
        for (sym, err) in &errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_forecast_cmd(
    symbol: String,
    years: u32,
    config_path: Option<PathBuf>,
    catalog: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    offline: bool,
    synthetic: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RunConfig::from_file(&path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(catalog) = catalog {
        config.catalog = catalog;
    }
    if let Some(cache_dir) = cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }

    let end = chrono::Local::now().date_naive();
    let opts = LoadOptions {
        start: end - chrono::Duration::days(365 * i64::from(config.history_years)),
        end,
        offline,
        synthetic,
        force: false,
    };

    let catalogs = CatalogCache::new();
    let cache = HistoryCache::new(&config.cache_dir);
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);
    let provider_ref: Option<&dyn tickercast_core::data::provider::PriceProvider> =
        if offline { None } else { Some(&provider) };

    let request = PipelineRequest { symbol, years };
    let progress: &dyn ProgressSink = &StdoutProgress;

    let report = run_pipeline(
        &config,
        &catalogs,
        &cache,
        provider_ref,
        &SeasonalTrendModel,
        &request,
        &opts,
        progress,
    )?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, &config.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = HistoryCache::new(cache_dir);
    let entries = cache.status();

    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", entries.len());
    println!();
    println!(
        "{:<16} {:<25} {:<10} {:<12} {}",
        "Symbol", "Date Range", "Rows", "Source", "Cached At"
    );
    println!("{}", "-".repeat(80));
    for (symbol, meta) in &entries {
        println!(
            "{:<16} {:<25} {:<10} {:<12} {}",
            symbol,
            format!("{} to {}", meta.requested_start, meta.requested_end),
            meta.row_count,
            meta.source,
            meta.cached_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

fn parse_date_arg(arg: Option<&str>) -> Result<Option<NaiveDate>> {
    match arg {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)")),
    }
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("=== {} ({}) ===", report.display_name, report.symbol);
    println!("Source:       {:?}", report.source);
    println!("History rows: {}", report.history.len());
    if let (Some(first), Some(last)) = (report.history.first(), report.history.last()) {
        println!("Period:       {} to {}", first.date, last.date);
    }
    println!("Data hash:    {}", report.data_hash);

    println!();
    println!("--- Last 5 trading days ---");
    for r in report.history_tail(5) {
        println!(
            "{}  open {:>10.2}  high {:>10.2}  low {:>10.2}  close {:>10.2}  vol {:>12}",
            r.date, r.open, r.high, r.low, r.close, r.volume
        );
    }

    match (&report.forecast, &report.forecast_error) {
        (Some(forecast), _) => {
            println!();
            println!("--- Forecast (horizon {} days) ---", report.horizon_days);
            for r in forecast.tail(5) {
                println!(
                    "{}  forecast {:>10.2}  [{:>10.2}, {:>10.2}]",
                    r.timestamp, r.point_estimate, r.lower_bound, r.upper_bound
                );
            }
        }
        (None, Some(err)) => {
            println!();
            println!("WARNING: forecast unavailable: {err}");
            println!("Raw price history is shown above.");
        }
        (None, None) => {}
    }
    println!();
}
