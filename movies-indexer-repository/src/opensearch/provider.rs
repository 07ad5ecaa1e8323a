//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate. The `_bulk`, `_doc` and `_search`
//! endpoints it uses are wire-compatible with Elasticsearch 7+/8.

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, GetParts, OpenSearch, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::bulk::{BulkPayload, BulkResponseSummary};
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::IndexConfig;

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use movies_indexer_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::all()).await?;
/// provider.ensure_indices().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    indices: Vec<IndexConfig>,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `indices` - Index configurations created by `ensure_indices`
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, indices: Vec<IndexConfig>) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            indices = ?indices.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            "Created OpenSearch provider"
        );

        Ok(Self { client, indices })
    }

    /// Check the backend is reachable.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        Self::check_status("Ping", response).await.map(|_| ())
    }

    /// Turn a non-success response into a `RequestFailed` error.
    async fn check_status(
        operation: &'static str,
        response: Response,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(operation, status = %status, body = %error_body, "Request failed");
        Err(SearchIndexError::request_failed(
            operation,
            status.as_u16(),
            error_body,
        ))
    }

    async fn create_index(&self, config: &IndexConfig) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&config.name))
            .body(config.body.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %config.name, "Created index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        // Another instance may have created it between the check and the create.
        if error_body.contains("resource_already_exists_exception") {
            debug!(index = %config.name, "Index already created");
            return Ok(());
        }

        Err(SearchIndexError::index_creation(format!(
            "Creating index '{}' failed with status {}: {}",
            config.name, status, error_body
        )))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_indices(&self) -> Result<(), SearchIndexError> {
        for config in &self.indices {
            let response = self
                .client
                .indices()
                .exists(IndicesExistsParts::Index(&[config.name.as_str()]))
                .send()
                .await
                .map_err(|e| SearchIndexError::connection(e.to_string()))?;

            match response.status_code().as_u16() {
                200 => debug!(index = %config.name, "Index exists"),
                404 => self.create_index(config).await?,
                status => {
                    return Err(SearchIndexError::index_creation(format!(
                        "Checking index '{}' returned status {}",
                        config.name, status
                    )));
                }
            }
        }

        Ok(())
    }

    async fn bulk_index(
        &self,
        payload: &BulkPayload,
    ) -> Result<BulkResponseSummary, SearchIndexError> {
        if payload.is_empty() {
            return Ok(BulkResponseSummary::default());
        }

        let body: Vec<JsonBody<Value>> = payload
            .lines()
            .iter()
            .cloned()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let response = Self::check_status("Bulk", response).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = BulkResponseSummary::from_response(&body);
        if summary.errors {
            warn!(
                index = %payload.index(),
                items = summary.items,
                failed = summary.failed,
                "Bulk request reported item errors"
            );
        } else {
            debug!(
                index = %payload.index(),
                items = summary.items,
                took_ms = summary.took_ms,
                "Bulk request completed"
            );
        }

        Ok(summary)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchIndexError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            debug!(index, id, "Document not found");
            return Ok(None);
        }

        let response = Self::check_status("Get", response).await?;
        let mut body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Ok(match body.get_mut("_source") {
            Some(source) => Some(source.take()),
            None => None,
        })
    }

    async fn search(&self, index: &str, body: Value) -> Result<Vec<Value>, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            debug!(index, "Search on missing index");
            return Ok(Vec::new());
        }

        let response = Self::check_status("Search", response).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Ok(extract_sources(body))
    }
}

/// Pull the `_source` of every hit out of a search response.
fn extract_sources(mut body: Value) -> Vec<Value> {
    match body["hits"]["hits"].take() {
        Value::Array(hits) => hits
            .into_iter()
            .filter_map(|mut hit| match hit.get_mut("_source") {
                Some(source) => Some(source.take()),
                None => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
