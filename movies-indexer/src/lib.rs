//! # Movies Indexer
//!
//! Keeps the movie catalog's search indices in step with its Postgres
//! database by polling for rows changed since a stored checkpoint.
//!
//! ## Architecture
//!
//! The indexer follows the Reader-Processor-Loader pattern:
//!
//! 1. **Reader**: Streams changed rows out of Postgres in batches
//! 2. **Processor**: Transforms rows into search documents
//! 3. **Loader**: Bulk-indexes documents into OpenSearch
//! 4. **Orchestrator**: Runs one pass per sync target and advances checkpoints
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`reader`]: Change detection queries and the Postgres reader
//! - [`processor`]: Transforms rows into documents
//! - [`loader`]: Indexes documents into OpenSearch
//! - [`checkpoint`]: Checkpoint storage
//! - [`orchestrator`]: Coordinates the sync flow
//! - [`backoff`]: Retry delays for transient failures
//! - [`errors`]: Error types for the indexer

pub mod backoff;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod reader;

pub use config::{Dependencies, Settings};
pub use errors::IngestError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, PassOutcome, SyncTarget};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
