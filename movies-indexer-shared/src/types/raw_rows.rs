//! Raw rows read from the relational catalog.
//!
//! Rows are decoded loosely: every catalog field is optional so that the
//! processor, not the reader, decides what a malformed row is. Only
//! `updated_at` is required, since the sync checkpoint is derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One person attached to a film work, as produced by `JSON_AGG`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonCredit {
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub person_role: Option<String>,
}

impl PersonCredit {
    pub fn new(
        person_id: impl Into<String>,
        person_name: impl Into<String>,
        person_role: impl Into<String>,
    ) -> Self {
        Self {
            person_id: Some(person_id.into()),
            person_name: Some(person_name.into()),
            person_role: Some(person_role.into()),
        }
    }
}

/// One `(film_id, role)` pair attached to a person.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilmCredit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl FilmCredit {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role.into()),
        }
    }
}

/// A film work row with its aggregated persons and genre names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilmWorkRow {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub kind: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub persons: Vec<PersonCredit>,
    pub genres: Option<Vec<String>>,
}

/// A genre row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenreRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A person row with the flat list of films they are credited on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersonRow {
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub films: Vec<FilmCredit>,
}

/// A row of any of the three catalog shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    FilmWork(FilmWorkRow),
    Genre(GenreRow),
    Person(PersonRow),
}

impl RawRow {
    /// The row's modification timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            RawRow::FilmWork(row) => row.updated_at,
            RawRow::Genre(row) => row.updated_at,
            RawRow::Person(row) => row.updated_at,
        }
    }

    /// The root entity id, if present.
    pub fn id(&self) -> Option<&str> {
        match self {
            RawRow::FilmWork(row) => row.id.as_deref(),
            RawRow::Genre(row) => row.id.as_deref(),
            RawRow::Person(row) => row.id.as_deref(),
        }
    }
}

impl From<FilmWorkRow> for RawRow {
    fn from(row: FilmWorkRow) -> Self {
        RawRow::FilmWork(row)
    }
}

impl From<GenreRow> for RawRow {
    fn from(row: GenreRow) -> Self {
        RawRow::Genre(row)
    }
}

impl From<PersonRow> for RawRow {
    fn from(row: PersonRow) -> Self {
        RawRow::Person(row)
    }
}
