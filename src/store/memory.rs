//! In-memory key-value store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::store::KvStore;

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expire_hint: Option<Duration>,
}

// == Memory Store ==
/// Ordered in-memory [`KvStore`], used by the server binary and in tests.
///
/// Expire hints are recorded but never acted upon; expiry is the cache's job.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: BTreeMap<String, StoredValue>,
    capacity_hint: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store carrying a capacity hint.
    ///
    /// A `BTreeMap` cannot preallocate, so the hint is only reported back.
    pub fn with_capacity_hint(capacity_hint: Option<usize>) -> Self {
        Self {
            data: BTreeMap::new(),
            capacity_hint,
        }
    }

    /// Returns the capacity hint this store was created with.
    pub fn capacity_hint(&self) -> Option<usize> {
        self.capacity_hint
    }

    /// Returns the expire hint recorded for `key`.
    pub fn expire_hint(&self, key: &str) -> Option<Duration> {
        self.data.get(key).and_then(|v| v.expire_hint)
    }

    /// Returns the number of raw records held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.bytes.clone()))
    }

    fn set(&mut self, key: &str, value: Vec<u8>, expire_hint: Option<Duration>) -> Result<()> {
        self.data.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                expire_hint,
            },
        );
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = self
            .data
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        Ok(keys)
    }

    fn close(&mut self) -> Result<()> {
        debug!("Closing memory store with {} records", self.data.len());
        self.data.clear();
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::new();

        store.set("a", b"1".to_vec(), None).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let mut store = MemoryStore::new();
        assert!(store.delete("missing").is_ok());
    }

    #[test]
    fn test_scan_prefix_only() {
        let mut store = MemoryStore::new();
        store.set("cache:b", vec![], None).unwrap();
        store.set("cache:a", vec![], None).unwrap();
        store.set("cachf", vec![], None).unwrap();
        store.set("meta:cache:a", vec![], None).unwrap();

        let keys = store.scan("cache:").unwrap();
        assert_eq!(keys, vec!["cache:a".to_string(), "cache:b".to_string()]);
    }

    #[test]
    fn test_scan_empty_prefix_returns_all() {
        let mut store = MemoryStore::new();
        store.set("x", vec![], None).unwrap();
        store.set("y", vec![], None).unwrap();

        assert_eq!(store.scan("").unwrap().len(), 2);
    }

    #[test]
    fn test_expire_hint_recorded() {
        let mut store = MemoryStore::with_capacity_hint(Some(64));
        store
            .set("k", vec![1], Some(Duration::from_secs(30)))
            .unwrap();

        assert_eq!(store.expire_hint("k"), Some(Duration::from_secs(30)));
        assert_eq!(store.capacity_hint(), Some(64));
    }

    #[test]
    fn test_close_releases_records() {
        let mut store = MemoryStore::new();
        store.set("k", vec![1], None).unwrap();

        store.close().unwrap();
        assert!(store.is_empty());
    }
}
