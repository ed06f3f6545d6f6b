//! Symbol catalog — ticker → display name mapping loaded from CSV.
//!
//! The catalog file is a UTF-8, comma-delimited table with a header row and
//! at least the columns `symbol` and `name`. Extra columns are ignored.
//! Duplicate symbols resolve keep-last (the reference dataset occasionally
//! repeats a symbol with an updated display name).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use thiserror::Error;

/// One row of the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub symbol: String,
    pub name: String,
}

/// Structured error types for catalog loading.
///
/// Ordered by validation stage: existence, emptiness, schema, then any
/// remaining parse failure.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("catalog file has no data rows: {path}")]
    Empty { path: PathBuf },

    #[error("catalog is missing required column '{column}'")]
    SchemaInvalid { column: String },

    #[error("catalog unreadable: {0}")]
    Unreadable(String),
}

/// Ticker → display name mapping.
///
/// Preserves first-seen symbol order for display while resolving duplicate
/// symbols keep-last.
#[derive(Debug, Clone)]
pub struct SymbolCatalog {
    entries: Vec<SymbolEntry>,
    index: HashMap<String, usize>,
}

impl SymbolCatalog {
    /// Load and validate a catalog CSV.
    ///
    /// Validation order:
    /// 1. file must exist → `NotFound`
    /// 2. file must contain at least a header row → `Empty`
    /// 3. `symbol` and `name` columns must be present → `SchemaInvalid`
    /// 4. any other parse failure → `Unreadable`
    /// 5. header-only files (zero data rows) → `Empty`
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Unreadable(format!("read {}: {e}", path.display())))?;
        if content.trim().is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }

        let catalog = Self::from_csv(&content)?;
        if catalog.is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(catalog)
    }

    /// Parse a catalog from CSV text. Exposed for tests and in-memory use;
    /// does not apply the zero-row check (callers decide whether empty is fatal).
    pub fn from_csv(content: &str) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| CatalogError::Unreadable(format!("header row: {e}")))?
            .clone();

        let symbol_idx = column_index(&headers, "symbol")?;
        let name_idx = column_index(&headers, "name")?;

        let mut catalog = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };

        for record in reader.records() {
            let record = record.map_err(|e| CatalogError::Unreadable(format!("data row: {e}")))?;
            let symbol = record
                .get(symbol_idx)
                .ok_or_else(|| CatalogError::Unreadable("short row: missing symbol field".into()))?
                .trim();
            let name = record
                .get(name_idx)
                .ok_or_else(|| CatalogError::Unreadable("short row: missing name field".into()))?
                .trim();

            if symbol.is_empty() {
                continue;
            }
            catalog.insert(symbol.to_string(), name.to_string());
        }

        Ok(catalog)
    }

    /// Insert an entry, keep-last on duplicate symbols (order preserved).
    fn insert(&mut self, symbol: String, name: String) {
        match self.index.get(&symbol) {
            Some(&i) => self.entries[i].name = name,
            None => {
                self.index.insert(symbol.clone(), self.entries.len());
                self.entries.push(SymbolEntry { symbol, name });
            }
        }
    }

    /// Display name for a symbol.
    pub fn display_name(&self, symbol: &str) -> Option<&str> {
        self.index
            .get(symbol)
            .map(|&i| self.entries[i].name.as_str())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Symbols in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| CatalogError::SchemaInvalid {
            column: column.to_string(),
        })
}

/// Process-wide catalog memoization keyed by (path, modification time).
///
/// The catalog is effectively static per run, so a reload only happens when
/// the file's mtime changes. Shared read-only via `Arc`.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: Mutex<HashMap<PathBuf, (SystemTime, Arc<SymbolCatalog>)>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog through the cache, reloading if the file changed on disk.
    pub fn load(&self, path: &Path) -> Result<Arc<SymbolCatalog>, CatalogError> {
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|_| CatalogError::NotFound {
                path: path.to_path_buf(),
            })?;

        let mut entries = self.entries.lock().unwrap();
        if let Some((cached_mtime, catalog)) = entries.get(path) {
            if *cached_mtime == mtime {
                return Ok(Arc::clone(catalog));
            }
        }

        let catalog = Arc::new(SymbolCatalog::load(path)?);
        entries.insert(path.to_path_buf(), (mtime, Arc::clone(&catalog)));
        Ok(catalog)
    }

    /// Drop all memoized catalogs.
    pub fn invalidate(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_csv(content: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "tickercast_catalog_{}_{id}.csv",
            std::process::id()
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_valid_catalog() {
        let path = temp_csv("symbol,name\nRELIANCE.NS,Reliance Industries\nTCS.NS,Tata Consultancy\n");
        let catalog = SymbolCatalog::load(&path).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.symbols(), vec!["RELIANCE.NS", "TCS.NS"]);
        assert_eq!(
            catalog.display_name("TCS.NS"),
            Some("Tata Consultancy")
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn key_set_matches_symbol_column() {
        let path = temp_csv("symbol,name,exchange\nA,Alpha,NSE\nB,Beta,NSE\nC,Gamma,BSE\n");
        let catalog = SymbolCatalog::load(&path).unwrap();

        assert_eq!(catalog.symbols(), vec!["A", "B", "C"]);
        assert!(catalog.contains("B"));
        assert!(!catalog.contains("D"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn duplicate_symbol_keeps_last() {
        let path = temp_csv("symbol,name\nA,Old Name\nB,Beta\nA,New Name\n");
        let catalog = SymbolCatalog::load(&path).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.display_name("A"), Some("New Name"));
        // Order stays first-seen
        assert_eq!(catalog.symbols(), vec!["A", "B"]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = PathBuf::from("/nonexistent/tickercast_symbols.csv");
        let err = SymbolCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn empty_file_is_empty() {
        let path = temp_csv("");
        let err = SymbolCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn header_only_file_is_empty() {
        let path = temp_csv("symbol,name\n");
        let err = SymbolCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_name_column_is_schema_invalid() {
        let path = temp_csv("symbol,exchange\nA,NSE\n");
        let err = SymbolCatalog::load(&path).unwrap_err();
        match err {
            CatalogError::SchemaInvalid { column } => assert_eq!(column, "name"),
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_symbol_column_is_schema_invalid() {
        let path = temp_csv("ticker,name\nA,Alpha\n");
        let err = SymbolCatalog::load(&path).unwrap_err();
        match err {
            CatalogError::SchemaInvalid { column } => assert_eq!(column, "symbol"),
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_row_is_unreadable() {
        // Wrong field count fails strict (non-flexible) parsing on the data row.
        let path = temp_csv("symbol,name\nA,Alpha,extra,fields\nB,Beta\n");
        let err = SymbolCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable(_)));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn blank_symbol_rows_are_skipped() {
        let path = temp_csv("symbol,name\nA,Alpha\n,No Symbol\nB,Beta\n");
        let catalog = SymbolCatalog::load(&path).unwrap();
        assert_eq!(catalog.symbols(), vec!["A", "B"]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn cache_returns_same_catalog_for_unchanged_file() {
        let path = temp_csv("symbol,name\nA,Alpha\n");
        let cache = CatalogCache::new();

        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn cache_invalidate_forces_reload() {
        let path = temp_csv("symbol,name\nA,Alpha\n");
        let cache = CatalogCache::new();

        let first = cache.load(&path).unwrap();
        cache.invalidate();
        let second = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.symbols(), second.symbols());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn cache_propagates_missing_file() {
        let cache = CatalogCache::new();
        let err = cache
            .load(Path::new("/nonexistent/tickercast_symbols.csv"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }
}
