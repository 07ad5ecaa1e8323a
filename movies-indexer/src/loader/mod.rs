//! Loader module for the movies indexer.
//!
//! Writes documents into the search index with bulk requests.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::backoff::{retry_transient, BackoffPolicy};
use crate::errors::IngestError;
use movies_indexer_repository::{
    BulkPayload, BulkResponseSummary, SearchIndexError, SearchIndexProvider,
};
use movies_indexer_shared::SearchDocument;

/// Loader that indexes documents into the search engine.
///
/// Each upload is a single bulk request, retried with backoff for as long as
/// it fails with a transient error. Per-document results are not checked;
/// a response flagging item errors is only logged.
pub struct BulkIndexer {
    provider: Arc<dyn SearchIndexProvider>,
    backoff: BackoffPolicy,
}

impl BulkIndexer {
    /// Create a new bulk indexer with the default backoff.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_backoff(provider, BackoffPolicy::default())
    }

    pub fn with_backoff(provider: Arc<dyn SearchIndexProvider>, backoff: BackoffPolicy) -> Self {
        Self { provider, backoff }
    }

    /// Index `documents` into `index`.
    ///
    /// An empty slice sends nothing.
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    pub async fn upload(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<BulkResponseSummary, IngestError> {
        if documents.is_empty() {
            return Ok(BulkResponseSummary::default());
        }

        let payload = BulkPayload::build(index, documents)?;
        let provider = &self.provider;
        let payload = &payload;

        let summary = retry_transient(
            &self.backoff,
            "bulk_index",
            move || provider.bulk_index(payload),
            SearchIndexError::is_transient,
        )
        .await?;

        if summary.errors {
            warn!(
                index,
                items = summary.items,
                failed = summary.failed,
                "Bulk upload accepted with item errors"
            );
        } else {
            debug!(index, items = summary.items, "Bulk upload complete");
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use movies_indexer_shared::GenreDocument;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Mock search provider failing a fixed number of times before succeeding.
    struct MockSearchProvider {
        failures: Mutex<Vec<SearchIndexError>>,
        attempts: Mutex<Vec<Instant>>,
        payloads: Mutex<Vec<Vec<Value>>>,
        item_errors: bool,
    }

    impl MockSearchProvider {
        fn new(failures: Vec<SearchIndexError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                attempts: Mutex::new(Vec::new()),
                payloads: Mutex::new(Vec::new()),
                item_errors: false,
            }
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockSearchProvider {
        async fn ensure_indices(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_index(
            &self,
            payload: &BulkPayload,
        ) -> Result<BulkResponseSummary, SearchIndexError> {
            self.attempts.lock().unwrap().push(Instant::now());
            let mut failures = self.failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
            self.payloads.lock().unwrap().push(payload.lines().to_vec());
            Ok(BulkResponseSummary {
                took_ms: 1,
                errors: self.item_errors,
                items: payload.document_count(),
                failed: usize::from(self.item_errors),
            })
        }

        async fn get_document(
            &self,
            _index: &str,
            _id: &str,
        ) -> Result<Option<Value>, SearchIndexError> {
            Ok(None)
        }

        async fn search(&self, _index: &str, _body: Value) -> Result<Vec<Value>, SearchIndexError> {
            Ok(Vec::new())
        }
    }

    fn genres(ids: &[&str]) -> Vec<SearchDocument> {
        ids.iter()
            .map(|id| {
                SearchDocument::Genre(GenreDocument {
                    id: id.to_string(),
                    name: format!("Genre {}", id),
                    description: None,
                })
            })
            .collect()
    }

    fn backoff() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(100), 2, Duration::from_millis(300))
    }

    #[tokio::test]
    async fn test_upload_sends_one_bulk_request() {
        let provider = Arc::new(MockSearchProvider::new(vec![]));
        let indexer = BulkIndexer::new(provider.clone());

        let summary = indexer.upload("genres", &genres(&["a", "b"])).await.unwrap();

        assert_eq!(summary.items, 2);
        let payloads = provider.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 4);
        assert_eq!(
            payloads[0][0].to_string(),
            r#"{"index":{"_index":"genres","_id":"a"}}"#
        );
    }

    #[tokio::test]
    async fn test_empty_upload_is_a_no_op() {
        let provider = Arc::new(MockSearchProvider::new(vec![]));
        let indexer = BulkIndexer::new(provider.clone());

        indexer.upload("genres", &[]).await.unwrap();

        assert!(provider.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_backoff() {
        let provider = Arc::new(MockSearchProvider::new(vec![
            SearchIndexError::connection("connection refused"),
            SearchIndexError::request_failed("Bulk", 503, "unavailable"),
            SearchIndexError::request_failed("Bulk", 429, "too many requests"),
            SearchIndexError::connection("connection reset"),
        ]));
        let indexer = BulkIndexer::with_backoff(provider.clone(), backoff());

        let summary = indexer.upload("genres", &genres(&["a"])).await.unwrap();

        assert_eq!(summary.items, 1);
        let attempts = provider.attempts.lock().unwrap();
        let gaps: Vec<u128> = attempts
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![100, 200, 300, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_is_returned() {
        let provider = Arc::new(MockSearchProvider::new(vec![
            SearchIndexError::request_failed("Bulk", 400, "mapper_parsing_exception"),
        ]));
        let indexer = BulkIndexer::with_backoff(provider.clone(), backoff());

        let result = indexer.upload("genres", &genres(&["a"])).await;

        assert!(matches!(
            result,
            Err(IngestError::LoaderError(SearchIndexError::RequestFailed { status: 400, .. }))
        ));
        assert_eq!(provider.attempts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_item_errors_do_not_fail_the_upload() {
        let provider = Arc::new(MockSearchProvider {
            item_errors: true,
            ..MockSearchProvider::new(vec![])
        });
        let indexer = BulkIndexer::new(provider);

        let summary = indexer.upload("genres", &genres(&["a", "b"])).await.unwrap();

        assert!(summary.errors);
        assert_eq!(summary.failed, 1);
    }
}
