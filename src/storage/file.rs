//! File-backed key-value store.
//!
//! The whole map lives in one JSON object on disk. Every write is applied to
//! a copy, persisted through a temp file and rename, and only then becomes
//! visible in memory, so memory never runs ahead of disk.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use super::{check_quota, KeyValueStore};
use crate::error::{StorageError, StorageResult};

// == File Store ==
/// Persistent key-value store serialized to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl FileStore {
    /// Opens the store at `path`, creating it lazily on first write.
    ///
    /// A missing file is an empty store. A file that is not a JSON object of
    /// strings is logged and treated as empty; it is overwritten on the next write.
    pub async fn open(path: impl AsRef<Path>, quota_bytes: Option<usize>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Ignoring unreadable store file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Read(format!("{}: {}", path.display(), e))),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota_bytes,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, map: &HashMap<String, String>) -> StorageResult<()> {
        let contents = serde_json::to_string(map)?;
        let tmp = self.path.with_extension("tmp");

        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {}", self.path.display(), e)))
    }

    /// Applies `change` to a copy of the map, persists it, then commits it.
    async fn update<F>(&self, change: F) -> StorageResult<()>
    where
        F: FnOnce(&mut HashMap<String, String>) -> StorageResult<()>,
    {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        self.multi_set(vec![(key.to_string(), value)]).await
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        if !self.entries.lock().await.contains_key(key) {
            return Ok(());
        }
        self.update(|map| {
            map.remove(key);
            Ok(())
        })
        .await
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn multi_set(&self, pairs: Vec<(String, String)>) -> StorageResult<()> {
        let quota = self.quota_bytes;
        self.update(|map| {
            check_quota(map, &pairs, quota)?;
            map.extend(pairs);
            Ok(())
        })
        .await
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        self.update(|map| {
            for key in keys {
                map.remove(key);
            }
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.update(|map| {
            map.clear();
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Clear(e.to_string()))
    }
}
