//! Configuration types for the CatalogService.

use std::time::Duration;

/// Default lifetime of a cached document.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 5);

/// Configuration for the CatalogService.
#[derive(Debug, Clone)]
pub struct CatalogServiceConfig {
    /// How long a document fetched from the index stays in the cache.
    ///
    /// Defaults to 300 seconds for every entity kind.
    pub cache_ttl: Duration,
}

impl Default for CatalogServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl CatalogServiceConfig {
    /// Create a config with a custom cache lifetime.
    pub fn with_cache_ttl(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }
}
