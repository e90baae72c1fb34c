//! In-process key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_quota, KeyValueStore};
use crate::error::StorageResult;

// == Memory Store ==
/// Key-value store held in process memory with an optional byte quota.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store. `quota_bytes` limits the sum of key and value lengths.
    pub fn new(quota_bytes: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes,
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        let pair = [(key.to_string(), value)];
        check_quota(&entries, &pair, self.quota_bytes)?;
        let [(key, value)] = pair;
        entries.insert(key, value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn multi_set(&self, pairs: Vec<(String, String)>) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        check_quota(&entries, &pairs, self.quota_bytes)?;
        entries.extend(pairs);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
