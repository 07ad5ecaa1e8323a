//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and mappings for the three catalog
//! indices: `movies`, `genres` and `persons`.

use serde_json::{json, Value};

/// Name of the films index.
pub const MOVIES_INDEX: &str = "movies";

/// Name of the genres index.
pub const GENRES_INDEX: &str = "genres";

/// Name of the persons index.
pub const PERSONS_INDEX: &str = "persons";

/// Configuration for one search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name.
    pub name: String,
    /// Settings and mappings sent when the index is created.
    pub body: Value,
}

impl IndexConfig {
    /// Create a new index configuration.
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// The `movies` index.
    pub fn movies() -> Self {
        Self::new(MOVIES_INDEX, movies_index_settings())
    }

    /// The `genres` index.
    pub fn genres() -> Self {
        Self::new(GENRES_INDEX, genres_index_settings())
    }

    /// The `persons` index.
    pub fn persons() -> Self {
        Self::new(PERSONS_INDEX, persons_index_settings())
    }

    /// Every catalog index.
    pub fn all() -> Vec<Self> {
        vec![Self::movies(), Self::genres(), Self::persons()]
    }
}

/// Shared analysis settings.
///
/// English and Russian stemming with stopwords, since catalog titles and
/// names come in both languages.
fn analysis_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {"type": "stop", "stopwords": "_english_"},
                "english_stemmer": {"type": "stemmer", "language": "english"},
                "english_possessive_stemmer": {"type": "stemmer", "language": "possessive_english"},
                "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                "russian_stemmer": {"type": "stemmer", "language": "russian"}
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn person_ref_mapping() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": {"type": "keyword"},
            "name": {"type": "text", "analyzer": "ru_en"}
        }
    })
}

/// Settings and mappings for the `movies` index.
///
/// `title` carries a `raw` keyword sub-field for exact matching and sorting.
/// `actors` and `writers` are nested so that `{id, name}` pairs stay
/// together in queries.
pub fn movies_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "imdb_rating": {"type": "float"},
                "genre": {"type": "keyword"},
                "title": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"},
                "director": {"type": "text", "analyzer": "ru_en"},
                "actors_names": {"type": "text", "analyzer": "ru_en"},
                "writers_names": {"type": "text", "analyzer": "ru_en"},
                "actors": person_ref_mapping(),
                "writers": person_ref_mapping()
            }
        }
    })
}

/// Settings and mappings for the `genres` index.
pub fn genres_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"}
            }
        }
    })
}

/// Settings and mappings for the `persons` index.
pub fn persons_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "full_name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "films": {
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {
                        "id": {"type": "keyword"},
                        "roles": {"type": "keyword"}
                    }
                }
            }
        }
    })
}
