//! Row to document transforms.
//!
//! Each transform is a pure function of its input row.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use movies_indexer_shared::{
    FilmRoles, FilmWorkRow, GenreDocument, GenreRow, MovieDocument, PersonDocument, PersonRef,
    PersonRow, RawRow, SearchDocument,
};

const ROLE_ACTOR: &str = "actor";
const ROLE_WRITER: &str = "writer";
const ROLE_DIRECTOR: &str = "director";

/// The document shape a row is transformed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Movie,
    Genre,
    Person,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::Genre => "genre",
            EntityKind::Person => "person",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row that cannot become a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("{kind} row {}: missing field `{field}`", display_id(.id))]
    MissingField {
        kind: EntityKind,
        id: Option<String>,
        field: &'static str,
    },

    #[error("{kind} row {}: invalid field `{field}`: {reason}", display_id(.id))]
    InvalidField {
        kind: EntityKind,
        id: Option<String>,
        field: &'static str,
        reason: String,
    },

    /// The row's shape does not match the kind the target expects.
    #[error("expected a {expected} row, got a {actual} row {}", display_id(.id))]
    UnexpectedRow {
        expected: EntityKind,
        actual: EntityKind,
        id: Option<String>,
    },
}

impl TransformError {
    fn missing(kind: EntityKind, id: Option<&str>, field: &'static str) -> Self {
        Self::MissingField {
            kind,
            id: id.map(str::to_string),
            field,
        }
    }

    fn invalid(kind: EntityKind, id: Option<&str>, field: &'static str, reason: String) -> Self {
        Self::InvalidField {
            kind,
            id: id.map(str::to_string),
            field,
            reason,
        }
    }

    /// Id of the offending row, when it had one.
    pub fn row_id(&self) -> Option<&str> {
        match self {
            Self::MissingField { id, .. }
            | Self::InvalidField { id, .. }
            | Self::UnexpectedRow { id, .. } => id.as_deref(),
        }
    }
}

fn display_id(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("<unknown>")
}

/// Kind of document a raw row produces.
pub fn row_kind(row: &RawRow) -> EntityKind {
    match row {
        RawRow::FilmWork(_) => EntityKind::Movie,
        RawRow::Genre(_) => EntityKind::Genre,
        RawRow::Person(_) => EntityKind::Person,
    }
}

/// Transform any raw row into its document.
pub fn transform(row: &RawRow) -> Result<SearchDocument, TransformError> {
    match row {
        RawRow::FilmWork(row) => transform_movie(row).map(SearchDocument::from),
        RawRow::Genre(row) => transform_genre(row).map(SearchDocument::from),
        RawRow::Person(row) => transform_person(row).map(SearchDocument::from),
    }
}

fn required<'a>(
    kind: EntityKind,
    id: Option<&str>,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, TransformError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TransformError::missing(kind, id, field))
}

/// Build a movie document from a film row and its credits.
///
/// Persons are partitioned by role. Input order is kept inside each role
/// and credits with other roles are ignored.
pub fn transform_movie(row: &FilmWorkRow) -> Result<MovieDocument, TransformError> {
    let kind = EntityKind::Movie;
    let id = required(kind, None, "id", row.id.as_deref())?;
    Uuid::parse_str(id).map_err(|e| TransformError::invalid(kind, Some(id), "id", e.to_string()))?;
    let title = required(kind, Some(id), "title", row.title.as_deref())?;

    let mut actors = Vec::new();
    let mut writers = Vec::new();
    let mut directors = Vec::new();

    for credit in &row.persons {
        let bucket = match credit.person_role.as_deref() {
            Some(ROLE_ACTOR) => &mut actors,
            Some(ROLE_WRITER) => &mut writers,
            Some(ROLE_DIRECTOR) => &mut directors,
            _ => continue,
        };

        let person_id = required(kind, Some(id), "person_id", credit.person_id.as_deref())?;
        let person_name = required(kind, Some(id), "person_name", credit.person_name.as_deref())?;
        bucket.push(PersonRef {
            id: person_id.to_string(),
            name: person_name.to_string(),
        });
    }

    let join_names = |persons: &[PersonRef]| {
        let joined = persons
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(joined).filter(|s| !s.is_empty())
    };

    Ok(MovieDocument {
        id: id.to_string(),
        title: title.to_string(),
        description: row.description.clone(),
        imdb_rating: row.rating,
        genre: row.genres.clone(),
        director: join_names(&directors),
        actors_names: join_names(&actors),
        writers_names: Some(writers.iter().map(|p| p.name.clone()).collect()),
        actors: Some(actors),
        writers: Some(writers),
    })
}

/// Genre rows map one to one onto genre documents.
pub fn transform_genre(row: &GenreRow) -> Result<GenreDocument, TransformError> {
    let kind = EntityKind::Genre;
    let id = required(kind, None, "id", row.id.as_deref())?;
    let name = required(kind, Some(id), "name", row.name.as_deref())?;

    Ok(GenreDocument {
        id: id.to_string(),
        name: name.to_string(),
        description: row.description.clone(),
    })
}

/// Build a person document, grouping credits by film.
///
/// Films keep their first-seen order and each film lists its distinct roles
/// in first-seen order.
pub fn transform_person(row: &PersonRow) -> Result<PersonDocument, TransformError> {
    let kind = EntityKind::Person;
    let id = required(kind, None, "id", row.id.as_deref())?;
    let full_name = required(kind, Some(id), "full_name", row.full_name.as_deref())?;

    let mut films: Vec<FilmRoles> = Vec::new();
    for credit in &row.films {
        let film_id = required(kind, Some(id), "films.id", credit.id.as_deref())?;

        let position = match films.iter().position(|f| f.id == film_id) {
            Some(position) => position,
            None => {
                films.push(FilmRoles {
                    id: film_id.to_string(),
                    roles: Vec::new(),
                });
                films.len() - 1
            }
        };

        if let Some(role) = credit.role.as_deref().filter(|r| !r.is_empty()) {
            let roles = &mut films[position].roles;
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }
    }

    Ok(PersonDocument {
        id: id.to_string(),
        full_name: full_name.to_string(),
        films: Some(films),
    })
}
