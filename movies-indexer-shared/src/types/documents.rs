//! Document types for the search index.
//!
//! These are the denormalized shapes stored in the `movies`, `genres` and
//! `persons` indices. Optional fields that are `None` are left out of the
//! serialized document.

use serde::{Deserialize, Serialize};

/// A person reference embedded in a movie document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

/// Document stored in the `movies` index.
///
/// # Fields
///
/// - `director`: names of all directors, space-joined
/// - `actors` / `writers`: persons credited with that role, in source order
/// - `actors_names`: actor names, space-joined
/// - `writers_names`: writer names as a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writers_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<PersonRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writers: Option<Vec<PersonRef>>,
}

/// Document stored in the `genres` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One film a person is credited on, with every role they hold on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmRoles {
    pub id: String,
    pub roles: Vec<String>,
}

/// Document stored in the `persons` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub films: Option<Vec<FilmRoles>>,
}

/// Any document the indexer can write.
///
/// Serialized untagged, so each variant produces exactly its own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchDocument {
    Movie(MovieDocument),
    Genre(GenreDocument),
    Person(PersonDocument),
}

impl SearchDocument {
    /// The id used as the index `_id`.
    pub fn id(&self) -> &str {
        match self {
            SearchDocument::Movie(doc) => &doc.id,
            SearchDocument::Genre(doc) => &doc.id,
            SearchDocument::Person(doc) => &doc.id,
        }
    }
}

impl From<MovieDocument> for SearchDocument {
    fn from(doc: MovieDocument) -> Self {
        SearchDocument::Movie(doc)
    }
}

impl From<GenreDocument> for SearchDocument {
    fn from(doc: GenreDocument) -> Self {
        SearchDocument::Genre(doc)
    }
}

impl From<PersonDocument> for SearchDocument {
    fn from(doc: PersonDocument) -> Self {
        SearchDocument::Person(doc)
    }
}
