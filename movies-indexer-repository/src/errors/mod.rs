//! Error types for the movies indexer repository.
//!
//! This module provides the error types for search index and cache operations.

mod cache_error;
mod search_index_error;

pub use cache_error::CacheError;
pub use search_index_error::SearchIndexError;
