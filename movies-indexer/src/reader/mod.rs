//! Reader module for the movies indexer.
//!
//! Streams rows changed since a checkpoint out of the catalog database, in
//! batches.

mod postgres;
pub mod queries;

pub use postgres::PostgresChangeReader;

use std::pin::Pin;

use futures::Stream;
use thiserror::Error;

use crate::orchestrator::SyncTarget;
use movies_indexer_shared::{Checkpoint, RawRow};

/// Errors raised while reading changes.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The database could not be reached, or the connection dropped.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// The database rejected the query.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A row did not have the expected columns or types.
    #[error("Row decode error: {0}")]
    DecodeError(String),
}

impl ReaderError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Whether retrying the whole read later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

/// One batch of changed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub rows: Vec<RawRow>,
    /// Largest `updated_at` among `rows`.
    pub max_updated_at: Checkpoint,
}

impl ChangeBatch {
    /// Wrap `rows`, or `None` when there are none.
    pub fn new(rows: Vec<RawRow>) -> Option<Self> {
        let max_updated_at = rows.iter().map(RawRow::updated_at).max()?;
        Some(Self {
            rows,
            max_updated_at: Checkpoint::new(max_updated_at),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub type ChangeStream<'a> =
    Pin<Box<dyn Stream<Item = Result<ChangeBatch, ReaderError>> + Send + 'a>>;

/// Source of changed rows.
///
/// The stream yields batches of at most `batch_size` rows in query order. An
/// error ends the stream.
pub trait ChangeReader: Send + Sync {
    fn read(&self, target: SyncTarget, since: Checkpoint, batch_size: usize) -> ChangeStream<'_>;
}
