//! Namespaced helpers over [`ExpiringCache`].
//!
//! Each helper only prefixes the key; behavior is that of `set`/`get`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::ExpiringCache;
use crate::error::StorageResult;

/// Prefix for semi-static API data cached with the default TTL.
pub const CACHE_PREFIX: &str = "cache_";
/// Prefix for user preferences.
pub const USER_PREF_PREFIX: &str = "user_pref_";
/// Prefix for app-level data.
pub const APP_DATA_PREFIX: &str = "app_data_";

impl ExpiringCache {
    /// Caches `value` for the configured default TTL.
    pub async fn set_cache<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let ttl = self.default_ttl_minutes;
        self.set(&format!("{CACHE_PREFIX}{key}"), value, Some(ttl)).await
    }

    pub async fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(&format!("{CACHE_PREFIX}{key}")).await
    }

    pub async fn remove_cache(&self, key: &str) -> StorageResult<()> {
        self.remove(&format!("{CACHE_PREFIX}{key}")).await
    }

    /// Stores a user preference. Preferences never expire.
    pub async fn set_user_preference<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.set(&format!("{USER_PREF_PREFIX}{key}"), value, None).await
    }

    pub async fn get_user_preference<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(&format!("{USER_PREF_PREFIX}{key}")).await
    }

    /// Stores app data. App data never expires.
    pub async fn set_app_data<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.set(&format!("{APP_DATA_PREFIX}{key}"), value, None).await
    }

    pub async fn get_app_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(&format!("{APP_DATA_PREFIX}{key}")).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::{ExpiringCache, ManualClock};
    use crate::storage::{KeyValueStore, MemoryStore};

    #[tokio::test]
    async fn test_set_cache_uses_default_ttl() {
        let store = Arc::new(MemoryStore::new(None));
        let clock = ManualClock::new(0);
        let cache =
            ExpiringCache::with_clock(store.clone(), Arc::new(clock.clone())).with_default_ttl(5);

        cache.set_cache("categories", &vec!["dairy", "produce"]).await.unwrap();
        assert!(store.get_item("cache_categories").await.unwrap().is_some());

        clock.advance(Duration::from_secs(4 * 60));
        let categories: Option<Vec<String>> = cache.get_cache("categories").await;
        assert_eq!(categories.map(|c| c.len()), Some(2));

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get_cache::<Vec<String>>("categories").await, None);
    }

    #[tokio::test]
    async fn test_preferences_and_app_data_do_not_expire() {
        let store = Arc::new(MemoryStore::new(None));
        let clock = ManualClock::new(0);
        let cache = ExpiringCache::with_clock(store.clone(), Arc::new(clock.clone()));

        cache.set_user_preference("theme", &"dark").await.unwrap();
        cache.set_app_data("onboarded", &true).await.unwrap();

        clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
        assert_eq!(
            cache.get_user_preference::<String>("theme").await.as_deref(),
            Some("dark")
        );
        assert_eq!(cache.get_app_data::<bool>("onboarded").await, Some(true));
        assert!(store.get_item("user_pref_theme").await.unwrap().is_some());
        assert!(store.get_item("app_data_onboarded").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_cache() {
        let cache = ExpiringCache::new(Arc::new(MemoryStore::new(None)));
        cache.set_cache("areas", &[94107, 94110]).await.unwrap();
        cache.remove_cache("areas").await.unwrap();
        assert_eq!(cache.get_cache::<Vec<u32>>("areas").await, None);
    }
}
