//! # Movies Indexer Shared
//!
//! This crate defines the data structures shared across the movies indexer:
//! the raw rows read from the relational catalog, the denormalized documents
//! written to the search index, and the checkpoint timestamp that tracks sync
//! progress.

pub mod types;

pub use types::checkpoint::{Checkpoint, CheckpointParseError};
pub use types::documents::{
    FilmRoles, GenreDocument, MovieDocument, PersonDocument, PersonRef, SearchDocument,
};
pub use types::raw_rows::{FilmCredit, FilmWorkRow, GenreRow, PersonCredit, PersonRow, RawRow};
pub use types::search_query::{
    MovieFilter, RatingOrder, SearchPage, SearchQuery, MAX_RESULT_WINDOW,
};
