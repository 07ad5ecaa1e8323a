//! Checkpoint storage for the sync driver.
//!
//! A checkpoint is the largest `updated_at` a pass has fully indexed. Each
//! sync target keeps its own key.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use movies_indexer_shared::Checkpoint;

/// Errors raised while reading or writing checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The backing storage could not be read or written.
    #[error("Checkpoint storage error: {0}")]
    StorageError(String),

    /// The stored state is not a JSON object of strings.
    #[error("Corrupt checkpoint state: {0}")]
    CorruptState(String),

    /// A stored value is not a timestamp.
    #[error("Invalid checkpoint for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl CheckpointError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptState(msg.into())
    }
}

/// Key-value storage of checkpoints.
///
/// `set` must be durable when it returns: a crash right after it must not
/// lose the value, nor leave a half-written one behind.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Checkpoint>, CheckpointError>;
    async fn set(&self, key: &str, value: Checkpoint) -> Result<(), CheckpointError>;
}
