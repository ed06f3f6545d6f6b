//! History loading with cache, download, and synthetic fallback.
//!
//! Resolution policy for a symbol:
//! 1. Cache entry covering the requested range → use it
//! 2. Provider available → fetch, write through the cache
//! 3. `synthetic` enabled → generate tagged synthetic records
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode; reports produced from it
//! carry `DataSource::Synthetic` so the presentation layer can flag them.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tickercast_core::data::{
    cache::{Coverage, HistoryCache},
    provider::{DataSource, FetchError, PriceProvider, PriceRecord},
};
use tickercast_core::progress::{ProgressSink, Stage};

/// Errors from the history loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached history for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedHistoryOffline { symbol: String },

    #[error("no cached history for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Options controlling how history is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start of the training range.
    pub start: NaiveDate,
    /// End of the training range (usually today).
    pub end: NaiveDate,
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate synthetic records when real data is unavailable.
    pub synthetic: bool,
    /// Force a refetch even when the cache covers the range.
    pub force: bool,
}

/// Result of loading history, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub symbol: String,
    pub records: Vec<PriceRecord>,
    pub source: DataSource,
    /// Deterministic BLAKE3 hash over all record data.
    pub data_hash: String,
}

/// Load price history for a symbol with the fallback policy above.
pub fn load_history(
    symbol: &str,
    cache: &HistoryCache,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
    progress: &dyn ProgressSink,
) -> Result<LoadedHistory, LoadError> {
    progress.report(Stage::FetchStarted, 0);

    // Step 1: cache hit when the stored range covers the request
    if !opts.force && cache.covers(symbol, opts.start, opts.end) == Coverage::Covered {
        if let Ok(records) = cache.load(symbol) {
            // The stored entry may span a wider range than this request;
            // the result must depend on the request, not on cache state.
            let records: Vec<PriceRecord> = records
                .into_iter()
                .filter(|r| r.date >= opts.start && r.date <= opts.end)
                .collect();
            if !records.is_empty() {
                progress.report(Stage::FetchComplete, 10);
                return Ok(finish(symbol, records, DataSource::Cache));
            }
            // Covered range but no rows inside it; fall through to refetch.
        }
        // Corrupt entry was quarantined; fall through to refetch.
    }

    // Step 2: download (write-through)
    if !opts.offline {
        if let Some(prov) = provider {
            if prov.is_available() {
                match prov.fetch(symbol, opts.start, opts.end) {
                    Ok(fetched) => {
                        cache.store(symbol, opts.start, opts.end, &fetched.records, prov.name())?;
                        progress.report(Stage::FetchComplete, 10);
                        return Ok(finish(symbol, fetched.records, fetched.source));
                    }
                    Err(FetchError::SymbolNotFound { symbol }) => {
                        return Err(FetchError::SymbolNotFound { symbol }.into());
                    }
                    Err(e) => {
                        if !opts.synthetic {
                            return Err(LoadError::DownloadFailed {
                                symbol: symbol.to_string(),
                                reason: e.to_string(),
                            });
                        }
                        // Fall through to synthetic.
                    }
                }
            }
        }
    }

    // Step 3: synthetic fallback
    if opts.synthetic {
        eprintln!(
            "WARNING: generating synthetic history for {symbol} — results will be tagged as synthetic"
        );
        let records = generate_synthetic_history(symbol, opts.start, opts.end);
        progress.report(Stage::FetchComplete, 10);
        return Ok(finish(symbol, records, DataSource::Synthetic));
    }

    // Step 4: fail
    if opts.offline {
        return Err(LoadError::NoCachedHistoryOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: "history not cached and no provider available".into(),
    })
}

fn finish(symbol: &str, records: Vec<PriceRecord>, source: DataSource) -> LoadedHistory {
    let data_hash = hash_history(&records);
    LoadedHistory {
        symbol: symbol.to_string(),
        records,
        source,
        data_hash,
    }
}

/// Deterministic BLAKE3 hash over dates and OHLCV values.
fn hash_history(records: &[PriceRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for rec in records {
        hasher.update(rec.date.to_string().as_bytes());
        hasher.update(&rec.open.to_le_bytes());
        hasher.update(&rec.high.to_le_bytes());
        hasher.update(&rec.low.to_le_bytes());
        hasher.update(&rec.close.to_le_bytes());
        hasher.update(&rec.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic weekday records for development and testing.
///
/// A random walk from 100.0, deterministically seeded from the symbol name.
fn generate_synthetic_history(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceRecord> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut records = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        // Skip weekends so the shape matches real exchange calendars.
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        records.push(PriceRecord {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    records
}
