//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over history sources (Yahoo Finance,
//! cache, synthetic) so implementations can be swapped and mocked for tests.
//! Providers must deliver clean data: daily records sorted strictly
//! ascending by date with no duplicates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV record for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceRecord {
    /// Basic OHLCV sanity check: positive prices, high >= low, open/close within range.
    pub fn is_sane(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.open > 0.0
            && self.close > 0.0
            && self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
    }
}

/// Structured error types for history retrieval.
///
/// Displayable in both CLI and report contexts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider returned no price history for '{symbol}' in the requested range")]
    EmptyHistory { symbol: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("no cached history for symbol '{symbol}' — run `download {symbol}` first")]
    NoCachedHistory { symbol: String },

    #[error("fetch error: {0}")]
    Other(String),
}

/// Result of a successful history fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub records: Vec<PriceRecord>,
    pub source: DataSource,
}

/// Where the history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
}

/// Trait for price history providers.
///
/// The cache layer sits above this trait — providers don't know about the cache.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily price records for a symbol over an inclusive date range.
    ///
    /// The returned records are sorted strictly ascending by date with no
    /// duplicate dates.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
