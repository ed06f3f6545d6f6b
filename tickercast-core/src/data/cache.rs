//! Parquet history cache — explicit fetch memoization keyed by (symbol, date range).
//!
//! Layout: `{cache_dir}/{SYMBOL}/history.parquet` + `meta.json` sidecar.
//! The sidecar records the *requested* date range, so a later request is a
//! cache hit only when its range is covered by what was already fetched.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0)
//! - Quarantine for corrupt files (history.parquet.quarantined)
//! - BLAKE3 data hash in the sidecar for provenance

use super::provider::{FetchError, PriceRecord};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = "history.parquet";

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryCacheMeta {
    pub symbol: String,
    /// Start of the range that was requested when this entry was written.
    pub requested_start: NaiveDate,
    /// End of the range that was requested when this entry was written.
    pub requested_end: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// How well a cached entry covers a requested date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    NotCached,
    Covered,
    Partial {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

/// The Parquet history cache.
pub struct HistoryCache {
    cache_dir: PathBuf,
}

impl HistoryCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(symbol)
    }

    fn history_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(HISTORY_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Write records for a symbol, replacing any previous entry.
    ///
    /// `requested_start`/`requested_end` form the memoization key together
    /// with the symbol. Writes are atomic: write to .tmp then rename.
    pub fn store(
        &self,
        symbol: &str,
        requested_start: NaiveDate,
        requested_end: NaiveDate,
        records: &[PriceRecord],
        source: &str,
    ) -> Result<(), FetchError> {
        if records.is_empty() {
            return Err(FetchError::CacheError("no records to cache".into()));
        }

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| FetchError::CacheError(format!("failed to create dir: {e}")))?;

        let df = records_to_dataframe(records)?;
        let path = self.history_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            FetchError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = HistoryCacheMeta {
            symbol: symbol.to_string(),
            requested_start,
            requested_end,
            row_count: records.len(),
            data_hash: hash_records(records)?,
            source: source.to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| FetchError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| FetchError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load cached records for a symbol, sorted by date ascending.
    pub fn load(&self, symbol: &str) -> Result<Vec<PriceRecord>, FetchError> {
        let path = self.history_path(symbol);
        if !path.exists() {
            return Err(FetchError::NoCachedHistory {
                symbol: symbol.to_string(),
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(mut records) => {
                records.sort_by_key(|r| r.date);
                Ok(records)
            }
            Err(e) => {
                // Quarantine the corrupt file so the next run refetches.
                let quarantine = path.with_extension("parquet.quarantined");
                eprintln!(
                    "WARNING: quarantining corrupt cache file {}: {e}",
                    path.display()
                );
                let _ = fs::rename(&path, &quarantine);
                Err(FetchError::NoCachedHistory {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    /// Metadata for a cached symbol, if present.
    pub fn meta(&self, symbol: &str) -> Option<HistoryCacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Check whether a cached entry covers the requested range.
    pub fn covers(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Coverage {
        match self.meta(symbol) {
            None => Coverage::NotCached,
            Some(meta) => {
                if meta.requested_start <= start && meta.requested_end >= end {
                    Coverage::Covered
                } else {
                    Coverage::Partial {
                        cached_start: meta.requested_start,
                        cached_end: meta.requested_end,
                    }
                }
            }
        }
    }

    /// Symbols with a cache entry, sorted, with row counts.
    pub fn status(&self) -> Vec<(String, HistoryCacheMeta)> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut out: Vec<(String, HistoryCacheMeta)> = entries
            .flatten()
            .filter_map(|entry| {
                let symbol = entry.file_name().to_str()?.to_string();
                let meta = self.meta(&symbol)?;
                Some((symbol, meta))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Deterministic BLAKE3 hash over all record fields.
fn hash_records(records: &[PriceRecord]) -> Result<String, FetchError> {
    let mut hasher = blake3::Hasher::new();
    for rec in records {
        hasher.update(rec.date.to_string().as_bytes());
        hasher.update(&rec.open.to_le_bytes());
        hasher.update(&rec.high.to_le_bytes());
        hasher.update(&rec.low.to_le_bytes());
        hasher.update(&rec.close.to_le_bytes());
        hasher.update(&rec.volume.to_le_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

const EXPECTED_COLS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

fn records_to_dataframe(records: &[PriceRecord]) -> Result<DataFrame, FetchError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = records.iter().map(|r| r.open).collect();
    let highs: Vec<f64> = records.iter().map(|r| r.high).collect();
    let lows: Vec<f64> = records.iter().map(|r| r.low).collect();
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
    let volumes: Vec<u64> = records.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| FetchError::CacheError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| FetchError::CacheError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), FetchError> {
    let file =
        fs::File::create(path).map_err(|e| FetchError::CacheError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| FetchError::CacheError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PriceRecord>, FetchError> {
    let file = fs::File::open(path).map_err(|e| FetchError::CacheError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| FetchError::CacheError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(FetchError::CacheError("empty parquet file".into()));
    }
    for col_name in &EXPECTED_COLS {
        if df.column(col_name).is_err() {
            return Err(FetchError::CacheError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_records(&df)
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<PriceRecord>, FetchError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| FetchError::CacheError(format!("column read: {e}")))
    };

    let date_ca = col("date")?
        .date()
        .map_err(|e| FetchError::CacheError(format!("date column type: {e}")))?
        .clone();
    let open_ca = col("open")?
        .f64()
        .map_err(|e| FetchError::CacheError(format!("open column type: {e}")))?
        .clone();
    let high_ca = col("high")?
        .f64()
        .map_err(|e| FetchError::CacheError(format!("high column type: {e}")))?
        .clone();
    let low_ca = col("low")?
        .f64()
        .map_err(|e| FetchError::CacheError(format!("low column type: {e}")))?
        .clone();
    let close_ca = col("close")?
        .f64()
        .map_err(|e| FetchError::CacheError(format!("close column type: {e}")))?
        .clone();
    let vol_ca = col("volume")?
        .u64()
        .map_err(|e| FetchError::CacheError(format!("volume column type: {e}")))?
        .clone();

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let n = df.height();
    let mut records = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| FetchError::CacheError(format!("null date at row {i}")))?;
        let date = epoch + chrono::Duration::days(date_days as i64);

        records.push(PriceRecord {
            date,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }

    Ok(records)
}
