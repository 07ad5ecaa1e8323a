use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CheckpointError, CheckpointStore};
use movies_indexer_shared::Checkpoint;

/// In-process checkpoint store. State is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Checkpoint)>,
        K: Into<String>,
    {
        Self {
            values: Mutex::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Current value of `key`.
    pub fn value(&self, key: &str) -> Option<Checkpoint> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).copied())
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let values = self
            .values
            .lock()
            .map_err(|e| CheckpointError::storage(e.to_string()))?;
        Ok(values.get(key).copied())
    }

    async fn set(&self, key: &str, value: Checkpoint) -> Result<(), CheckpointError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| CheckpointError::storage(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
