//! Expiring Cache Module
//!
//! Per-entry TTL on top of a flat key-value store. Expired entries are evicted
//! lazily when read and in bulk by the cleanup sweep.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock, LAST_CLEANUP_KEY};
use crate::error::{StorageError, StorageResult};
use crate::storage::KeyValueStore;

// == Expiring Cache ==
/// Key-value cache with optional per-entry expiration.
///
/// Reads never fail: a store error, a malformed entry or a type mismatch is
/// reported as a miss. Writes propagate store errors to the caller.
#[derive(Debug, Clone)]
pub struct ExpiringCache {
    /// Underlying store
    store: Arc<dyn KeyValueStore>,
    /// Time source for timestamps and expiry
    clock: Arc<dyn Clock>,
    /// Shared counters
    stats: Arc<StatsRecorder>,
    /// TTL in minutes used by `set_cache`
    pub(crate) default_ttl_minutes: u64,
}

impl ExpiringCache {
    // == Constructor ==
    /// Creates a cache over `store` using the wall clock.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a cache over `store` with an explicit clock.
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            stats: Arc::new(StatsRecorder::default()),
            default_ttl_minutes: 60,
        }
    }

    /// Sets the TTL used by `set_cache`.
    pub fn with_default_ttl(mut self, minutes: u64) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }

    /// The store this cache writes to.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn encode<T: Serialize>(&self, value: &T, ttl_minutes: Option<u64>) -> StorageResult<String> {
        let entry = CacheEntry::new(value, self.now_ms(), ttl_minutes);
        Ok(serde_json::to_string(&entry)?)
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// With `ttl_minutes` the entry expires that many minutes from now.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_minutes: Option<u64>,
    ) -> StorageResult<()> {
        let raw = self.encode(value, ttl_minutes)?;
        self.store.set_item(key, raw).await.map_err(|e| {
            warn!("Cache write failed for '{}': {}", key, e);
            e
        })
    }

    // == Get ==
    /// Returns the live value stored under `key`.
    ///
    /// An expired entry is deleted before `None` is returned.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.record_miss();
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for '{}', treating as miss: {}", key, e);
                self.stats.record_miss();
                return None;
            }
        };

        let value = match self.decode_live(key, &raw) {
            Decoded::Live(data) => serde_json::from_value(data).ok(),
            Decoded::Expired => {
                self.evict(key).await;
                None
            }
            Decoded::Malformed => None,
        };

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    fn decode_live(&self, key: &str, raw: &str) -> Decoded {
        let Some(entry) = CacheEntry::<Value>::parse(raw) else {
            debug!("Malformed cache entry for '{}'", key);
            return Decoded::Malformed;
        };
        if entry.is_expired_at(self.now_ms()) {
            Decoded::Expired
        } else {
            Decoded::Live(entry.data)
        }
    }

    async fn evict(&self, key: &str) {
        match self.store.remove_item(key).await {
            Ok(()) => {
                debug!("Evicted expired cache entry '{}'", key);
                self.stats.record_expired_eviction();
            }
            Err(e) => warn!("Failed to evict expired cache entry '{}': {}", key, e),
        }
    }

    // == Remove ==
    /// Removes `key`. Missing keys are ignored.
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        self.store.remove_item(key).await
    }

    // == Clear ==
    /// Removes every entry in the store.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.clear().await.map_err(|e| match e {
            StorageError::Clear(_) => e,
            other => StorageError::Clear(other.to_string()),
        })?;
        info!("Cache cleared");
        Ok(())
    }

    // == Multi Get ==
    /// Reads several keys at once.
    ///
    /// Keys that are absent, malformed, expired or of the wrong type are left
    /// out of the result. Expired entries are deleted, as with `get`.
    pub async fn multi_get<T, K>(&self, keys: &[K]) -> Vec<(String, T)>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let pairs = match self.store.multi_get(&keys).await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("Cache batch read failed, treating as miss: {}", e);
                for _ in &keys {
                    self.stats.record_miss();
                }
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        let mut expired = Vec::new();
        for (key, raw) in pairs {
            let value = match raw.as_deref().map(|raw| self.decode_live(&key, raw)) {
                Some(Decoded::Live(data)) => serde_json::from_value(data).ok(),
                Some(Decoded::Expired) => {
                    expired.push(key.clone());
                    None
                }
                Some(Decoded::Malformed) | None => None,
            };
            match value {
                Some(value) => {
                    self.stats.record_hit();
                    found.push((key, value));
                }
                None => self.stats.record_miss(),
            }
        }

        if !expired.is_empty() {
            match self.store.multi_remove(&expired).await {
                Ok(()) => {
                    for _ in &expired {
                        self.stats.record_expired_eviction();
                    }
                }
                Err(e) => warn!("Failed to evict {} expired cache entries: {}", expired.len(), e),
            }
        }

        found
    }

    // == Multi Set ==
    /// Writes several entries at once, all with the same TTL.
    pub async fn multi_set<T, K, I>(&self, entries: I, ttl_minutes: Option<u64>) -> StorageResult<()>
    where
        T: Serialize,
        K: Into<String>,
        I: IntoIterator<Item = (K, T)>,
    {
        let pairs: Vec<(String, String)> = entries
            .into_iter()
            .map(|(key, value)| Ok((key.into(), self.encode(&value, ttl_minutes)?)))
            .collect::<StorageResult<_>>()?;
        self.store.multi_set(pairs).await
    }

    // == Multi Remove ==
    /// Removes several keys at once.
    pub async fn multi_remove<K: AsRef<str>>(&self, keys: &[K]) -> StorageResult<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self.store.multi_remove(&keys).await
    }

    // == Cleanup Expired ==
    /// Scans every key and removes entries whose expiry has passed.
    ///
    /// Entries that do not parse are left in place. Returns the number removed.
    pub async fn cleanup_expired_items(&self) -> StorageResult<usize> {
        let keys = self.store.get_all_keys().await?;
        let now = self.now_ms();

        let expired: Vec<String> = self
            .store
            .multi_get(&keys)
            .await?
            .into_iter()
            .filter_map(|(key, raw)| {
                let entry = CacheEntry::<Value>::parse(raw.as_deref()?)?;
                entry.is_expired_at(now).then_some(key)
            })
            .collect();

        let count = expired.len();
        if count > 0 {
            self.store.multi_remove(&expired).await?;
            self.stats.record_swept(count);
        }

        debug!("Cache sweep scanned {} keys, removed {}", keys.len(), count);
        Ok(count)
    }

    // == Cleanup If Due ==
    /// Runs the sweep only if the last one is older than `interval`.
    ///
    /// Returns the number removed, or `None` if the sweep was skipped.
    pub async fn cleanup_if_due(&self, interval: Duration) -> StorageResult<Option<usize>> {
        let now = self.now_ms();
        if let Some(last) = self.get::<i64>(LAST_CLEANUP_KEY).await {
            if now.saturating_sub(last) < interval.as_millis() as i64 {
                debug!("Cache sweep not due yet");
                return Ok(None);
            }
        }

        self.cleanup_and_record().await.map(Some)
    }

    /// Runs the sweep and records its start time under [`LAST_CLEANUP_KEY`].
    pub async fn cleanup_and_record(&self) -> StorageResult<usize> {
        let started = self.now_ms();
        let removed = self.cleanup_expired_items().await?;
        self.set(LAST_CLEANUP_KEY, &started, None).await?;
        if removed > 0 {
            info!("Cache sweep removed {} expired entries", removed);
        }
        Ok(removed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// Outcome of inspecting a raw stored entry.
enum Decoded {
    Live(Value),
    Expired,
    Malformed,
}
