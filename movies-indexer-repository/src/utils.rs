//! Utility functions for the movies indexer repository.

use uuid::Uuid;

use crate::errors::SearchIndexError;

/// Cache key for a document: `{index}-{id}`, e.g. `movies-<uuid>`.
pub fn cache_key(index: &str, id: &str) -> String {
    format!("{}-{}", index, id)
}

/// Validate that a document id is a UUID and return it in canonical form.
///
/// # Example
///
/// ```
/// use movies_indexer_repository::parse_document_id;
///
/// let id = parse_document_id("550E8400-E29B-41D4-A716-446655440000").expect("valid UUID");
/// assert_eq!(id, "550e8400-e29b-41d4-a716-446655440000");
/// ```
pub fn parse_document_id(id: &str) -> Result<String, SearchIndexError> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|e| SearchIndexError::validation(format!("Invalid document id '{}': {}", id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("movies", "42"), "movies-42");
    }

    #[test]
    fn test_parse_document_id() {
        let id = parse_document_id(" 6ba7b810-9dad-11d1-80b4-00c04fd430c8 ").unwrap();
        assert_eq!(id, "6ba7b810-9dad-11d1-80b4-00c04fd430c8");
    }

    #[test]
    fn test_parse_document_id_invalid() {
        let result = parse_document_id("invalid");
        assert!(matches!(
            result.unwrap_err(),
            SearchIndexError::ValidationError(_)
        ));
    }
}
