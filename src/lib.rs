//! Cache Layer - A TTL-aware key-value cache with statistics
//!
//! Wraps a plain key-value store with per-entry expiration, hit/miss
//! statistics, single-flight loading and a session store built on top.

pub mod api;
pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, TtlCache};
pub use config::{CacheConfig, Config, SessionConfig};
pub use error::{CacheError, Result};
pub use session::SessionStore;
pub use store::{KvStore, MemoryStore};
pub use tasks::spawn_cleanup_task;
