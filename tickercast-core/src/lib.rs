//! TickerCast Core — symbol catalog, price history, training frame, forecast model.
//!
//! This crate contains the building blocks of the forecast pipeline:
//! - Symbol catalog loading and validation (CSV with `symbol`/`name` columns)
//! - Price history provider trait with a Yahoo Finance implementation
//! - Parquet history cache keyed by (symbol, date range)
//! - Training frame projection of (date, close) with ordering checks
//! - Seasonal-trend forecast model behind a swappable trait seam
//! - Progress reporting through an explicit `ProgressSink`

pub mod catalog;
pub mod data;
pub mod forecast;
pub mod frame;
pub mod progress;

pub use catalog::{CatalogCache, CatalogError, SymbolCatalog, SymbolEntry};
pub use frame::{BuildError, TrainingFrame, TrainingPoint};
pub use progress::{NullProgress, ProgressSink, Stage, StdoutProgress};
