//! Cache provider trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CacheError;

/// A string key/value cache with per-entry expiry.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch a cached value. `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Release the connection. Nothing to do for caches without one.
    async fn close(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
