//! Cache Module
//!
//! Provides persistent caching with per-entry TTL and lazy expiration.

mod clock;
mod entry;
mod namespaced;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, MS_PER_MINUTE};
pub use namespaced::{APP_DATA_PREFIX, CACHE_PREFIX, USER_PREF_PREFIX};
pub use stats::CacheStats;
pub use store::ExpiringCache;

// == Public Constants ==
/// Key holding the timestamp of the last cleanup sweep
pub const LAST_CLEANUP_KEY: &str = "last_cache_cleanup";
