use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CheckpointError, CheckpointStore};
use movies_indexer_shared::Checkpoint;

type StateMap = BTreeMap<String, String>;

/// Checkpoints kept as one JSON object in a local file.
///
/// Writes go to `<file>.tmp`, are synced to disk and then renamed over the
/// state file, so readers only ever see a complete map.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn read_state(&self) -> Result<StateMap, CheckpointError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StateMap::new()),
            Err(e) => {
                return Err(CheckpointError::storage(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(StateMap::new());
        }

        serde_json::from_str(&raw)
            .map_err(|e| CheckpointError::corrupt(format!("{}: {}", self.path.display(), e)))
    }

    async fn write_state(&self, state: &StateMap) -> Result<(), CheckpointError> {
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| CheckpointError::storage(e.to_string()))?;
        let tmp = self.tmp_path();
        let io_error =
            |e: std::io::Error| CheckpointError::storage(format!("writing {}: {}", tmp.display(), e));

        let mut file = fs::File::create(&tmp).await.map_err(io_error)?;
        file.write_all(&body).await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            CheckpointError::storage(format!(
                "renaming {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl CheckpointStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let state = self.read_state().await?;
        state
            .get(key)
            .map(|raw| {
                Checkpoint::parse(raw).map_err(|e| CheckpointError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    async fn set(&self, key: &str, value: Checkpoint) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;

        let mut state = self.read_state().await?;
        state.insert(key.to_string(), value.to_string());
        self.write_state(&state).await?;

        debug!(key, checkpoint = %value, path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }
}
