//! Application bootstrap
//!
//! Builds the shared services once at startup and runs the initialization
//! sequence: storage self-test, connectivity probe and a due cache sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::AppError;
use crate::reviews::{HttpReviewApi, ReviewApi, ReviewListController};
use crate::storage::{open_store, KeyValueStore};

/// Key written and removed by the storage self-test.
pub const STORAGE_PROBE_KEY: &str = "storage_self_test";

// == Connectivity ==
/// Answers whether the backend is reachable right now.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

#[async_trait]
impl ConnectivityProbe for HttpReviewApi {
    async fn is_online(&self) -> bool {
        match self.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Backend at {} unreachable: {}", self.base_url(), e);
                false
            }
        }
    }
}

// == Init Report ==
/// Outcome of [`AppContext::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Storage accepted a write and returned it
    pub storage_ok: bool,
    /// Backend answered the connectivity probe
    pub online: bool,
    /// Entries removed by the sweep, `None` if it was not due or failed
    pub swept: Option<usize>,
}

// == App Context ==
/// Services shared by the whole client, built once and passed around.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub cache: ExpiringCache,
    reviews_api: Arc<dyn ReviewApi>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl AppContext {
    /// Assembles a context from already-built parts.
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        reviews_api: Arc<dyn ReviewApi>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let cache = ExpiringCache::new(store).with_default_ttl(config.default_cache_ttl_minutes);
        Self {
            config,
            cache,
            reviews_api,
            probe,
        }
    }

    /// Opens the configured store and HTTP review client.
    pub async fn from_config(config: Config) -> Result<Self, AppError> {
        let store = open_store(&config).await?;
        let api = Arc::new(HttpReviewApi::from_config(&config)?);
        Ok(Self::new(config, store, api.clone(), api))
    }

    pub fn reviews_api(&self) -> Arc<dyn ReviewApi> {
        self.reviews_api.clone()
    }

    /// New review list controller using the configured page size.
    pub fn review_controller(&self) -> ReviewListController {
        ReviewListController::new(self.reviews_api.clone(), self.config.reviews_page_size)
    }

    // == Initialize ==
    /// Runs the startup checks. None of them is fatal.
    pub async fn initialize(&self) -> InitReport {
        let storage_ok = self.storage_self_test().await;
        let online = self.probe.is_online().await;

        let swept = if storage_ok {
            match self.cache.cleanup_if_due(self.config.cleanup_interval()).await {
                Ok(swept) => swept,
                Err(e) => {
                    warn!("Startup cache sweep failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let report = InitReport {
            storage_ok,
            online,
            swept,
        };
        info!(
            "Initialization finished: storage_ok={}, online={}, swept={:?}",
            report.storage_ok, report.online, report.swept
        );
        report
    }

    async fn storage_self_test(&self) -> bool {
        if let Err(e) = self.cache.set(STORAGE_PROBE_KEY, &"ok", None).await {
            error!("Storage self-test write failed: {}", e);
            return false;
        }

        let read_back = self.cache.get::<String>(STORAGE_PROBE_KEY).await;
        if let Err(e) = self.cache.remove(STORAGE_PROBE_KEY).await {
            warn!("Storage self-test cleanup failed: {}", e);
        }

        match read_back.as_deref() {
            Some("ok") => true,
            _ => {
                error!("Storage self-test read back {:?}", read_back);
                false
            }
        }
    }
}
