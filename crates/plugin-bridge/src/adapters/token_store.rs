//! Token store adapters.
//!
//! - `InMemoryTokenStore`: process-local, for tests and ephemeral plugins
//! - `JsonFileTokenStore`: one JSON object file mapping keys to records

use crate::domain::token::TokenRecord;
use crate::error::StorageError;
use crate::ports::outbound::TokenStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one record.
    pub fn with_record(key: &str, record: TokenRecord) -> Self {
        let store = Self::new();
        store.records.write().insert(key.to_string(), record);
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn set(&self, key: &str, record: &TokenRecord) -> Result<(), StorageError> {
        self.records.write().insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// File-backed store. Writes go to a sibling temp file and are renamed into
/// place, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileTokenStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(&self) -> Result<HashMap<String, TokenRecord>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TokenStore for JsonFileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, StorageError> {
        let mut records = self.load_all().await?;
        Ok(records.remove(key))
    }

    async fn set(&self, key: &str, record: &TokenRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_all().await?;
        records.insert(key.to_string(), record.clone());
        let bytes = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), key = key, "Persisted token record");
        Ok(())
    }
}
