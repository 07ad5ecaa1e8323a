//! Cache error types.

use thiserror::Error;

/// Errors from the cache backend.
///
/// The read path treats every cache error as a miss, so these are only ever
/// logged.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Failed to connect to the cache.
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// A cache command failed.
    #[error("Cache command error: {0}")]
    CommandError(String),

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    SerializationError(String),
}

impl CacheError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
