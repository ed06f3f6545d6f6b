//! Price history retrieval and caching.

pub mod cache;
pub mod circuit_breaker;
pub mod provider;
pub mod yahoo;

pub use cache::{Coverage, HistoryCache, HistoryCacheMeta};
pub use circuit_breaker::CircuitBreaker;
pub use provider::{DataSource, FetchError, FetchResult, PriceProvider, PriceRecord};
pub use yahoo::YahooProvider;
