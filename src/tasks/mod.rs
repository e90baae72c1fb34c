//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the client is up.
//!
//! # Tasks
//! - Cache Cleanup: Sweeps expired cache entries at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
