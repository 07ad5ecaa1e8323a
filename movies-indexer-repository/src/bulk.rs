//! Bulk write payloads.
//!
//! A bulk payload alternates one action line and one document line per
//! document:
//!
//! ```text
//! {"index":{"_index":"movies","_id":"a"}}
//! {"id":"a","title":"..."}
//! ```

use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use movies_indexer_shared::SearchDocument;

/// A ready-to-send `_bulk` request body.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPayload {
    index: String,
    lines: Vec<Value>,
}

impl BulkPayload {
    /// Build the action/document line pairs for `documents` targeting `index`.
    ///
    /// The document id becomes the `_id`, so re-indexing a changed row
    /// overwrites the previous version.
    pub fn build(index: &str, documents: &[SearchDocument]) -> Result<Self, SearchIndexError> {
        let mut lines = Vec::with_capacity(documents.len() * 2);

        for document in documents {
            let id = document.id();
            if id.is_empty() {
                return Err(SearchIndexError::validation(format!(
                    "Document for index '{}' has an empty id",
                    index
                )));
            }

            lines.push(json!({"index": {"_index": index, "_id": id}}));
            lines.push(
                serde_json::to_value(document)
                    .map_err(|e| SearchIndexError::serialization(e.to_string()))?,
            );
        }

        Ok(Self {
            index: index.to_string(),
            lines,
        })
    }

    /// Target index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Number of documents in the payload.
    pub fn document_count(&self) -> usize {
        self.lines.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The JSON lines in request order.
    ///
    /// Each one is sent as its compact serialization followed by `\n`.
    pub fn lines(&self) -> &[Value] {
        &self.lines
    }
}

/// What the backend reported for a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponseSummary {
    /// Server-side processing time in milliseconds.
    pub took_ms: u64,
    /// The response's top-level `errors` flag.
    pub errors: bool,
    /// Number of items in the response.
    pub items: usize,
    /// Number of items carrying an `error` object.
    pub failed: usize,
}

impl BulkResponseSummary {
    /// Summarize a `_bulk` response body.
    pub fn from_response(body: &Value) -> Self {
        let items = body["items"].as_array();
        let failed = items
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        item.as_object()
                            .and_then(|actions| actions.values().next())
                            .map(|result| result.get("error").is_some())
                            .unwrap_or(false)
                    })
                    .count()
            })
            .unwrap_or(0);

        Self {
            took_ms: body["took"].as_u64().unwrap_or(0),
            errors: body["errors"].as_bool().unwrap_or(false),
            items: items.map(Vec::len).unwrap_or(0),
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies_indexer_shared::GenreDocument;

    fn genre(id: &str, name: &str) -> SearchDocument {
        SearchDocument::Genre(GenreDocument {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        })
    }

    #[test]
    fn test_bulk_payload_shape() {
        let docs = vec![genre("a", "Action"), genre("b", "Drama")];

        let payload = BulkPayload::build("movies", &docs).unwrap();
        let lines: Vec<String> = payload.lines().iter().map(Value::to_string).collect();

        assert_eq!(payload.document_count(), 2);
        assert_eq!(
            lines,
            vec![
                r#"{"index":{"_index":"movies","_id":"a"}}"#,
                r#"{"id":"a","name":"Action"}"#,
                r#"{"index":{"_index":"movies","_id":"b"}}"#,
                r#"{"id":"b","name":"Drama"}"#,
            ]
        );
    }

    #[test]
    fn test_empty_payload() {
        let payload = BulkPayload::build("genres", &[]).unwrap();
        assert!(payload.is_empty());
        assert!(payload.lines().is_empty());
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = BulkPayload::build("genres", &[genre("", "Nameless")]);
        assert!(matches!(
            result.unwrap_err(),
            SearchIndexError::ValidationError(_)
        ));
    }

    #[test]
    fn test_summary_counts_item_errors() {
        let body = json!({
            "took": 12,
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });

        let summary = BulkResponseSummary::from_response(&body);

        assert_eq!(
            summary,
            BulkResponseSummary {
                took_ms: 12,
                errors: true,
                items: 2,
                failed: 1,
            }
        );
    }
}
