//! Key-Value Store Module
//!
//! The durable collaborator the cache is layered over. The cache only ever
//! talks to it through [`KvStore`]; the engine behind it is not our concern.

mod memory;

use std::time::Duration;

use crate::error::Result;

pub use memory::MemoryStore;

/// Primitive operations the cache needs from a key-value store.
///
/// Implementations need not be internally synchronized: the cache serializes
/// writers and lets readers share through its own lock.
pub trait KvStore: Send + Sync + 'static {
    /// Returns the bytes stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// `expire_hint` is advisory; stores that support native expiry may use
    /// it, others ignore it.
    fn set(&mut self, key: &str, value: Vec<u8>, expire_hint: Option<Duration>) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Returns every key starting with `prefix`, in ascending order.
    fn scan(&self, prefix: &str) -> Result<Vec<String>>;

    /// Releases the store. Called once from the owning cache's `close`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
