//! Storage Module
//!
//! Flat, string-keyed, string-valued persistent stores behind a single
//! capability trait. The cache layer never knows which backend it talks to.

mod file;
mod memory;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::error::{StorageError, StorageResult};

pub use file::FileStore;
pub use memory::MemoryStore;

// == Key-Value Store Trait ==
/// Asynchronous string key-value store.
///
/// Writes are last-write-wins; implementations do not serialize independent
/// callers beyond what is needed to keep their own state consistent.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns the raw value stored under `key`.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: String) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Lists every key currently stored.
    async fn get_all_keys(&self) -> StorageResult<Vec<String>>;

    /// Batch read. Result order follows `keys`.
    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push((key.clone(), self.get_item(key).await?));
        }
        Ok(values)
    }

    /// Batch write.
    async fn multi_set(&self, pairs: Vec<(String, String)>) -> StorageResult<()> {
        for (key, value) in pairs {
            self.set_item(&key, value).await?;
        }
        Ok(())
    }

    /// Batch remove.
    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            self.remove_item(key).await?;
        }
        Ok(())
    }

    /// Removes every key.
    async fn clear(&self) -> StorageResult<()>;
}

// == Backend Selection ==
/// Opens the store selected by configuration.
pub async fn open_store(config: &Config) -> StorageResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new(config.storage_quota_bytes)),
        StorageBackend::File => {
            Arc::new(FileStore::open(&config.storage_path, config.storage_quota_bytes).await?)
        }
    };
    tracing::info!("Opened {} key-value store", store.name());
    Ok(store)
}

// == Quota Accounting ==
/// Checks that applying `pairs` to `map` stays within `limit`.
///
/// Usage counts key and value bytes.
pub(crate) fn check_quota(
    map: &HashMap<String, String>,
    pairs: &[(String, String)],
    limit: Option<usize>,
) -> StorageResult<()> {
    let Some(limit) = limit else {
        return Ok(());
    };

    // Later pairs win over earlier ones and over stored values.
    let mut sizes: HashMap<&str, usize> = map
        .iter()
        .map(|(k, v)| (k.as_str(), k.len() + v.len()))
        .collect();
    for (key, value) in pairs {
        sizes.insert(key.as_str(), key.len() + value.len());
    }
    let used: usize = sizes.values().sum();

    if used > limit {
        return Err(StorageError::Quota { used, limit });
    }
    Ok(())
}
