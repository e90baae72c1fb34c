//! Cache Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ExpiringCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The first sweep runs one full `interval` after spawning. Each sweep
/// records its time, so `cleanup_if_due` at the next startup skips a sweep
/// that already ran. A failed sweep is logged and retried on the next tick.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(24 * 60 * 60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: ExpiringCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.cleanup_and_record().await {
                Ok(0) => debug!("Cache cleanup: no expired entries found"),
                Ok(removed) => info!("Cache cleanup: removed {} expired entries", removed),
                Err(e) => warn!("Cache cleanup failed: {}", e),
            }
        }
    })
}
