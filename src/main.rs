//! Storefront Core - client bootstrap runner
//!
//! Builds the application context, runs the startup checks and keeps the
//! cache cleanup task alive until shutdown.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_core::{spawn_cleanup_task, AppContext, Config};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the configured store and review client
/// 4. Run storage self-test, connectivity probe and due cache sweep
/// 5. Start background cache cleanup task
/// 6. Wait for SIGINT/SIGTERM and stop the task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storefront core");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, default_ttl={}min, cleanup_interval={}h, api={}",
        config.storage_backend,
        config.default_cache_ttl_minutes,
        config.cleanup_interval_hours,
        config.api_base_url
    );

    let ctx = AppContext::from_config(config)
        .await
        .context("failed to build application context")?;

    let report = ctx.initialize().await;
    if !report.storage_ok {
        warn!("Storage self-test failed, caching will degrade to misses");
    }
    if !report.online {
        warn!("Review backend is offline");
    }

    let cleanup_handle = spawn_cleanup_task(ctx.cache.clone(), ctx.config.cleanup_interval());
    info!("Background cleanup task started");

    shutdown_signal().await?;

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = signal::ctrl_c() => {
                res.context("failed to install Ctrl+C handler")?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
