//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including both low-level backend errors and high-level application errors.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and `CatalogService`. Errors are
/// split into transient ones (network failures, 5xx, throttling), which the
/// indexer retries, and terminal ones, which fail the current sync pass.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., missing required fields, invalid ids).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    RequestFailed {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Bulk indexing request could not be built or sent.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create a search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an error from a non-success HTTP status.
    pub fn request_failed(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::RequestFailed {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, server errors and `429 Too Many Requests` are
    /// transient. Everything else is terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::RequestFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchIndexError::connection("reset by peer").is_transient());
        assert!(SearchIndexError::request_failed("Bulk", 503, "").is_transient());
        assert!(SearchIndexError::request_failed("Bulk", 429, "").is_transient());

        assert!(!SearchIndexError::request_failed("Bulk", 400, "").is_transient());
        assert!(!SearchIndexError::serialization("bad float").is_transient());
        assert!(!SearchIndexError::validation("empty id").is_transient());
    }

    #[test]
    fn test_request_failed_message() {
        let err = SearchIndexError::request_failed("Search", 404, "no such index");
        assert_eq!(
            err.to_string(),
            "Search failed with status 404: no such index"
        );
    }
}
