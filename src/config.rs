//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which key-value store implementation backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process map, lost on exit
    Memory,
    /// JSON file on disk
    File,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key-value store implementation
    pub storage_backend: StorageBackend,
    /// File used by the file backend
    pub storage_path: PathBuf,
    /// Optional byte quota for the store
    pub storage_quota_bytes: Option<usize>,
    /// TTL in minutes used by `set_cache`
    pub default_cache_ttl_minutes: u64,
    /// Minimum time between cache sweeps, in hours
    pub cleanup_interval_hours: u64,
    /// Base URL of the review backend
    pub api_base_url: String,
    /// Bearer token sent to the review backend
    pub api_key: Option<String>,
    /// Reviews fetched per page
    pub reviews_page_size: u32,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORAGE_BACKEND` - `memory` or `file` (default: memory)
    /// - `STORAGE_PATH` - Store file for the file backend (default: storefront-store.json)
    /// - `STORAGE_QUOTA_BYTES` - Store quota in bytes (default: unlimited)
    /// - `DEFAULT_CACHE_TTL_MINUTES` - TTL for `set_cache` (default: 60)
    /// - `CLEANUP_INTERVAL_HOURS` - Sweep frequency in hours (default: 24)
    /// - `API_BASE_URL` - Review backend URL (default: http://localhost:54321)
    /// - `API_KEY` - Bearer token (default: none)
    /// - `REVIEWS_PAGE_SIZE` - Reviews per page (default: 20)
    /// - `REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_backend: parse_env("STORAGE_BACKEND").unwrap_or(defaults.storage_backend),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            storage_quota_bytes: parse_env("STORAGE_QUOTA_BYTES"),
            default_cache_ttl_minutes: parse_env("DEFAULT_CACHE_TTL_MINUTES")
                .unwrap_or(defaults.default_cache_ttl_minutes),
            cleanup_interval_hours: parse_env("CLEANUP_INTERVAL_HOURS")
                .filter(|hours| *hours > 0)
                .unwrap_or(defaults.cleanup_interval_hours),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_key: env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            reviews_page_size: parse_env("REVIEWS_PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.reviews_page_size),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    /// Minimum time between cache sweeps, at least one hour.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours.max(1).saturating_mul(60 * 60))
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Memory,
            storage_path: PathBuf::from("storefront-store.json"),
            storage_quota_bytes: None,
            default_cache_ttl_minutes: 60,
            cleanup_interval_hours: 24,
            api_base_url: "http://localhost:54321".to_string(),
            api_key: None,
            reviews_page_size: 20,
            request_timeout_secs: 30,
        }
    }
}
