//! Persistent state storage
//!
//! Key/value state persisted as a single JSON document. The ledger lives under
//! one key; other keys are left as found so the file can be shared.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Durable key/value storage for ledger state
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Mark `key` as one that should roam between machines
    async fn set_synced(&self, key: &str, synced: bool) -> Result<()>;
}

#[async_trait]
impl<T: DurableStore + ?Sized> DurableStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn set_synced(&self, key: &str, synced: bool) -> Result<()> {
        (**self).set_synced(key, synced).await
    }
}

/// On-disk layout of the state file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateDocument {
    /// Application version that last wrote this state
    #[serde(default)]
    version: String,

    #[serde(default)]
    entries: BTreeMap<String, Value>,

    /// Keys flagged for cross-machine sync
    #[serde(default)]
    sync_keys: BTreeSet<String>,
}

/// JSON file backed store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys currently flagged for sync
    pub async fn synced_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_document().await?.sync_keys.into_iter().collect())
    }

    async fn read_document(&self) -> Result<StateDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateDocument::default());
            }
            Err(e) => {
                return Err(StoreError::ReadFailed(format!(
                    "Failed to read state file {}: {}",
                    self.path.display(),
                    e
                ))
                .into());
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            StoreError::ReadFailed(format!(
                "Failed to parse state file {}: {}",
                self.path.display(),
                e
            ))
            .into()
        })
    }

    async fn write_document(&self, mut document: StateDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::WriteFailed(format!("Failed to create state directory: {}", e))
            })?;
        }

        document.version = env!("CARGO_PKG_VERSION").to_string();

        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to serialize state: {}", e)))?;

        // Write beside the target then rename so a crash never leaves half a file
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("Failed to write state file: {}", e)))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("Failed to replace state file: {}", e)))?;

        debug!("Wrote state file {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let document = self.read_document().await?;
        Ok(document.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut document = self.read_document().await?;
        document.entries.insert(key.to_string(), value);
        self.write_document(document).await
    }

    async fn set_synced(&self, key: &str, synced: bool) -> Result<()> {
        let mut document = self.read_document().await?;
        let changed = if synced {
            document.sync_keys.insert(key.to_string())
        } else {
            document.sync_keys.remove(key)
        };

        if changed {
            self.write_document(document).await?;
        }
        Ok(())
    }
}

/// In-memory store for tests and session-only use
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    synced: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is flagged for sync
    pub fn is_synced(&self, key: &str) -> bool {
        self.synced
            .lock()
            .map(|synced| synced.contains(key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_synced(&self, key: &str, synced: bool) -> Result<()> {
        let mut keys = self
            .synced
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        if synced {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
        Ok(())
    }
}
