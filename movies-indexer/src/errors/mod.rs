//! Error types for the movies indexer pipeline.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::processor::TransformError;
use crate::reader::ReaderError;
use movies_indexer_repository::SearchIndexError;

/// Errors that can fail a sync pass.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(#[from] SearchIndexError),

    /// Error reading changes from the database.
    #[error("Reader error: {0}")]
    ReaderError(#[from] ReaderError),

    /// A row could not be turned into a document.
    #[error("Transform error: {0}")]
    TransformError(#[from] TransformError),

    /// The checkpoint could not be read or saved.
    #[error("Checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// Shutdown was requested while the pass was running.
    #[error("Interrupted by shutdown")]
    Interrupted,
}

impl IngestError {
    /// Whether the pass may succeed if run again unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LoaderError(e) => e.is_transient(),
            Self::ReaderError(e) => e.is_transient(),
            Self::TransformError(_) | Self::CheckpointError(_) | Self::Interrupted => false,
        }
    }
}
