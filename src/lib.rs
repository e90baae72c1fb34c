//! Storefront Core - client-side core of a grocery delivery storefront
//!
//! Provides an expiring key-value cache over swappable persistent stores and
//! a paginated review list controller backed by a remote review API.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod reviews;
pub mod storage;
pub mod tasks;

pub use bootstrap::{AppContext, InitReport};
pub use cache::ExpiringCache;
pub use config::Config;
pub use reviews::ReviewListController;
pub use tasks::spawn_cleanup_task;
