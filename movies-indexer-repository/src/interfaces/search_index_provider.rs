//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::bulk::{BulkPayload, BulkResponseSummary};
use crate::errors::SearchIndexError;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into the indexer's `BulkIndexer` and into
/// `CatalogService`, which keeps both testable with mock implementations.
///
/// # Index Initialization
///
/// Call `ensure_indices` during application startup so that the `movies`,
/// `genres` and `persons` indices exist with their mappings before the first
/// bulk write.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Create every catalog index that does not exist yet.
    ///
    /// Existing indices are left untouched.
    async fn ensure_indices(&self) -> Result<(), SearchIndexError>;

    /// Submit a bulk write.
    ///
    /// The payload is sent as a single `_bulk` request. Per-document results
    /// are summarized but not treated as errors.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponseSummary)` - If the request itself succeeded
    /// * `Err(SearchIndexError)` - If the request could not be sent or was rejected
    async fn bulk_index(
        &self,
        payload: &BulkPayload,
    ) -> Result<BulkResponseSummary, SearchIndexError>;

    /// Fetch the `_source` of one document.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Value))` - The stored document
    /// * `Ok(None)` - If the document (or index) does not exist
    /// * `Err(SearchIndexError)` - If the lookup fails
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchIndexError>;

    /// Run a search with a raw query body and return the `_source` of each hit.
    ///
    /// A missing index yields an empty result.
    async fn search(&self, index: &str, body: Value) -> Result<Vec<Value>, SearchIndexError>;
}
