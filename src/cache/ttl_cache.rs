//! TTL Cache Module
//!
//! Main cache engine layered over a [`KvStore`], with lazy TTL expiration,
//! cache-aside loading and hit/miss statistics.
//!
//! Each entry occupies two records in the store: the encoded value under
//! `{namespace}:{key}` and a JSON [`EntryMeta`] under `meta:{namespace}:{key}`.
//! Both are written and removed under the cache's write lock, so a reader
//! never observes one half of an entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheStats, EntryMeta, EntrySource, StatsCounters, MAX_KEY_LENGTH,
    MAX_TTL_SECONDS, META_PREFIX,
};
use crate::clock::{Clock, SystemClock};
use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::KvStore;

/// Per-key load lock plus the number of callers holding a ticket for it.
#[derive(Default)]
struct Flight {
    lock: Arc<Mutex<()>>,
    waiters: usize,
}

/// Membership in a key's flight; leaving is tied to `Drop` so a cancelled
/// load still releases its slot.
struct FlightTicket<'a> {
    inflight: &'a StdMutex<HashMap<String, Flight>>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(flight) = inflight.get_mut(&self.key) {
            flight.waiters = flight.waiters.saturating_sub(1);
            if flight.waiters == 0 {
                inflight.remove(&self.key);
            }
        }
    }
}

/// Raw state of one key as found in the store.
enum Probe {
    /// Metadata and value both present and not expired
    Live(EntryMeta, Vec<u8>),
    /// Expired, or only one of the two records present
    Stale { expired: bool },
    /// Nothing stored under the key
    Missing,
}

// == TTL Cache ==
/// Key-value cache with per-entry TTL over a pluggable store.
///
/// The cache is `Send + Sync`; share it with `Arc` instead of wrapping it in
/// another lock.
///
/// # Single-flight loading
/// Concurrent [`TtlCache::get_or_load`] misses on the same key run the loader
/// once. The other callers wait on a per-key lock and then read the stored
/// value. Loads of different keys never wait on each other.
///
/// # Lifecycle
/// The store is released exactly once: by [`TtlCache::close`], or when the
/// cache is dropped without being closed.
pub struct TtlCache<S: KvStore, C: Codec = JsonCodec> {
    /// The key-value collaborator
    store: RwLock<S>,
    /// Value serialization
    codec: C,
    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,
    /// Prefix separating this cache's records from others in the same store
    namespace: String,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Performance statistics
    stats: StatsCounters,
    /// Per-key locks for in-flight loads
    inflight: StdMutex<HashMap<String, Flight>>,
    /// Set once the store has been released
    closed: bool,
}

impl<S: KvStore> TtlCache<S, JsonCodec> {
    // == Constructor ==
    /// Opens a JSON-encoded cache over `store` using the system clock.
    pub fn open(store: S, config: CacheConfig) -> Result<Self> {
        Self::open_with(store, config, JsonCodec, Arc::new(SystemClock))
    }
}

impl<S: KvStore, C: Codec> TtlCache<S, C> {
    /// Opens a cache with an explicit codec and clock.
    pub fn open_with(store: S, config: CacheConfig, codec: C, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        info!(
            "Opening cache namespace '{}' with default TTL {}s",
            config.namespace, config.default_ttl
        );

        Ok(Self {
            store: RwLock::new(store),
            codec,
            clock,
            namespace: config.namespace,
            default_ttl: config.default_ttl,
            stats: StatsCounters::new(),
            inflight: StdMutex::new(HashMap::new()),
            closed: false,
        })
    }

    /// Replaces the clock, typically with a [`crate::clock::ManualClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default TTL in seconds.
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Namespace this cache's records live under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current time according to the cache's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` when the key is absent or expired. Expired entries are
    /// removed on the way out. Every call counts exactly one hit or miss.
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    /// Retrieves a value together with its metadata. Counted like [`TtlCache::get`].
    pub async fn get_entry<V: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<V>>> {
        let probe = {
            let store = self.store.read().await;
            self.probe(&*store, key, self.clock.now())?
        };

        match probe {
            Probe::Live(meta, bytes) => {
                let value = self.codec.decode(&bytes)?;
                self.stats.record_hit();
                Ok(Some(CacheEntry { value, meta }))
            }
            Probe::Stale { .. } => {
                self.evict_if_stale(key).await?;
                self.stats.record_miss();
                Ok(None)
            }
            Probe::Missing => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Checks whether `key` holds a live entry without touching hit/miss
    /// counters. Expired entries found here are evicted.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let probe = {
            let store = self.store.read().await;
            self.probe(&*store, key, self.clock.now())?
        };

        match probe {
            Probe::Live(..) => Ok(true),
            Probe::Stale { .. } => {
                self.evict_if_stale(key).await?;
                Ok(false)
            }
            Probe::Missing => Ok(false),
        }
    }

    // == Get Or Load ==
    /// Cache-aside read.
    ///
    /// On a hit the cached value is returned. On a miss `loader` runs, its
    /// result is stored with `ttl` (or the default) and returned. A loader
    /// error is returned unchanged and nothing is stored.
    pub async fn get_or_load<V, F, Fut, E>(
        &self,
        key: &str,
        loader: F,
        ttl: Option<u64>,
    ) -> std::result::Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: From<CacheError>,
    {
        validate_key(key)?;
        let ttl = self.resolve_ttl(ttl)?;

        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let ticket = self.join_flight(key);
        let _guard = ticket.lock.lock().await;
        self.load_once(key, loader, ttl).await
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and restarting its TTL.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Option<u64>) -> Result<()> {
        validate_key(key)?;
        let ttl = self.resolve_ttl(ttl)?;
        self.insert(key, value, ttl, EntrySource::Set).await
    }

    /// Restarts a live entry's TTL window without rewriting its value.
    ///
    /// Returns the refreshed metadata, or `None` if the key is absent or expired.
    pub async fn touch(&self, key: &str, ttl: Option<u64>) -> Result<Option<EntryMeta>> {
        let ttl = self.resolve_ttl(ttl)?;
        let mut store = self.store.write().await;
        let now = self.clock.now();

        match self.probe(&*store, key, now)? {
            Probe::Live(meta, _) => Ok(Some(self.write_refreshed(&mut *store, &meta, now, ttl)?)),
            Probe::Stale { expired } => {
                self.discard_stale(&mut *store, key, expired)?;
                Ok(None)
            }
            Probe::Missing => Ok(None),
        }
    }

    /// Reads a live entry and restarts its TTL window in one step.
    ///
    /// Counted like [`TtlCache::get`]. The returned metadata is the refreshed
    /// one, and no writer can slip in between the read and the refresh.
    pub async fn get_and_touch<V: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Option<u64>,
    ) -> Result<Option<CacheEntry<V>>> {
        let ttl = self.resolve_ttl(ttl)?;
        let mut store = self.store.write().await;
        let now = self.clock.now();

        match self.probe(&*store, key, now)? {
            Probe::Live(meta, bytes) => {
                let value = self.codec.decode(&bytes)?;
                let meta = self.write_refreshed(&mut *store, &meta, now, ttl)?;
                self.stats.record_hit();
                Ok(Some(CacheEntry { value, meta }))
            }
            Probe::Stale { expired } => {
                self.discard_stale(&mut *store, key, expired)?;
                self.stats.record_miss();
                Ok(None)
            }
            Probe::Missing => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Delete ==
    /// Removes an entry. Deleting an absent key is a no-op.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;

        let present = store.get(&self.meta_key(key))?.is_some()
            || store.get(&self.value_key(key))?.is_some();
        if !present {
            return Ok(());
        }

        self.remove_records(&mut *store, key)?;
        self.stats.record_delete();
        debug!("Deleted key '{}'", key);
        Ok(())
    }

    // == Warm Cache ==
    /// Bulk-inserts entries that all expire `ttl` after one shared timestamp.
    ///
    /// Fails fast: keys are validated and values encoded before anything is
    /// written. If the store fails part-way, entries written so far stay
    /// written and counted, and the error is returned.
    pub async fn warm_cache<I, V>(&self, entries: I, ttl: Option<u64>) -> Result<usize>
    where
        I: IntoIterator<Item = (String, V)>,
        V: Serialize,
    {
        let ttl = self.resolve_ttl(ttl)?;
        let encoded = entries
            .into_iter()
            .map(|(key, value)| {
                validate_key(&key)?;
                Ok((key, self.codec.encode(&value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut store = self.store.write().await;
        let now = self.clock.now();
        let mut written = 0usize;

        for (key, bytes) in encoded {
            if let Err(e) = self.write_records(&mut *store, &key, bytes, ttl, now, EntrySource::Warmed) {
                warn!("Cache warm stopped after {} entries: {}", written, e);
                self.stats.record_writes(written as u64);
                return Err(e);
            }
            written += 1;
        }

        self.stats.record_writes(written as u64);
        info!("Warmed cache namespace '{}' with {} entries", self.namespace, written);
        Ok(written)
    }

    // == Clear Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub async fn clear_expired(&self) -> Result<usize> {
        Ok(self.sweep_expired().await?.len())
    }

    /// Removes every expired entry and returns their keys.
    ///
    /// Value records left without metadata are purged too but not reported.
    pub async fn sweep_expired(&self) -> Result<Vec<String>> {
        let mut store = self.store.write().await;
        let now = self.clock.now();

        let mut expired = Vec::new();
        let mut orphans = 0usize;
        for meta_key in store.scan(&self.meta_prefix())? {
            let key = meta_key[self.meta_prefix().len()..].to_string();
            match self.probe(&*store, &key, now)? {
                Probe::Stale { expired: true } => {
                    self.remove_records(&mut *store, &key)?;
                    expired.push(key);
                }
                // Metadata left behind without its value
                Probe::Stale { expired: false } => {
                    self.remove_records(&mut *store, &key)?;
                    orphans += 1;
                }
                _ => {}
            }
        }

        for value_key in store.scan(&self.value_prefix())? {
            let key = &value_key[self.value_prefix().len()..];
            if store.get(&self.meta_key(key))?.is_none() {
                store.delete(&value_key)?;
                orphans += 1;
            }
        }

        self.stats.record_evictions(expired.len() as u64);
        if expired.is_empty() && orphans == 0 {
            debug!("Sweep of '{}': no expired entries found", self.namespace);
        } else {
            info!(
                "Sweep of '{}': removed {} expired entries, {} orphaned records",
                self.namespace,
                expired.len(),
                orphans
            );
        }
        Ok(expired)
    }

    /// Returns every live entry in this namespace, ordered by key.
    pub async fn entries<V: DeserializeOwned>(&self) -> Result<Vec<CacheEntry<V>>> {
        let store = self.store.read().await;
        let now = self.clock.now();

        let mut live = Vec::new();
        for meta_key in store.scan(&self.meta_prefix())? {
            let key = &meta_key[self.meta_prefix().len()..];
            if let Probe::Live(meta, bytes) = self.probe(&*store, key, now)? {
                live.push(CacheEntry {
                    value: self.codec.decode(&bytes)?,
                    meta,
                });
            }
        }
        Ok(live)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn get_stats(&self) -> Result<CacheStats> {
        let store = self.store.read().await;

        let mut total_keys = 0usize;
        let mut total_size_bytes = 0usize;
        for meta_key in store.scan(&self.meta_prefix())? {
            if let Some(bytes) = store.get(&meta_key)? {
                let meta: EntryMeta = serde_json::from_slice(&bytes)?;
                total_keys += 1;
                total_size_bytes += meta.size_bytes;
            }
        }

        Ok(self.stats.snapshot(total_keys, total_size_bytes))
    }

    /// Closes the underlying store, consuming the cache.
    ///
    /// Unlike a plain drop, a failure to release the store is returned.
    pub async fn close(mut self) -> Result<()> {
        info!("Closing cache namespace '{}'", self.namespace);
        self.closed = true;
        self.store.get_mut().close()
    }

    // == Internals ==

    fn value_prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    fn meta_prefix(&self) -> String {
        format!("{}:{}:", META_PREFIX, self.namespace)
    }

    fn value_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn meta_key(&self, key: &str) -> String {
        format!("{}:{}:{}", META_PREFIX, self.namespace, key)
    }

    fn resolve_ttl(&self, ttl: Option<u64>) -> Result<u64> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        validate_ttl(ttl)?;
        Ok(ttl)
    }

    fn probe(&self, store: &S, key: &str, now: DateTime<Utc>) -> Result<Probe> {
        let meta = match store.get(&self.meta_key(key))? {
            Some(bytes) => serde_json::from_slice::<EntryMeta>(&bytes)?,
            None => {
                return if store.get(&self.value_key(key))?.is_some() {
                    Ok(Probe::Stale { expired: false })
                } else {
                    Ok(Probe::Missing)
                };
            }
        };

        match store.get(&self.value_key(key))? {
            None => Ok(Probe::Stale { expired: false }),
            Some(_) if meta.is_expired_at(now) => Ok(Probe::Stale { expired: true }),
            Some(bytes) => Ok(Probe::Live(meta, bytes)),
        }
    }

    /// Runs `loader` unless a concurrent caller already filled `key`.
    /// Must be called while holding the key's flight lock.
    async fn load_once<V, F, Fut, E>(&self, key: &str, loader: F, ttl: u64) -> std::result::Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: From<CacheError>,
    {
        if let Some(entry) = self.peek::<V>(key).await? {
            debug!("Key '{}' loaded by a concurrent caller", key);
            return Ok(entry.value);
        }

        debug!("Loading key '{}' from source", key);
        let value = loader().await?;
        self.insert(key, &value, ttl, EntrySource::Loaded).await?;
        Ok(value)
    }

    /// Reads a live entry without counting it or evicting anything.
    async fn peek<V: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<V>>> {
        let store = self.store.read().await;
        match self.probe(&*store, key, self.clock.now())? {
            Probe::Live(meta, bytes) => Ok(Some(CacheEntry {
                value: self.codec.decode(&bytes)?,
                meta,
            })),
            _ => Ok(None),
        }
    }

    async fn insert<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: u64,
        source: EntrySource,
    ) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        let mut store = self.store.write().await;
        let now = self.clock.now();

        self.write_records(&mut *store, key, bytes, ttl, now, source)?;
        self.stats.record_writes(1);
        Ok(())
    }

    /// Writes the value record, then its metadata. If the metadata write
    /// fails the value record is removed so no half-written entry survives.
    fn write_records(
        &self,
        store: &mut S,
        key: &str,
        bytes: Vec<u8>,
        ttl: u64,
        now: DateTime<Utc>,
        source: EntrySource,
    ) -> Result<()> {
        let meta = EntryMeta::new(key, now, ttl, bytes.len(), source);
        let meta_bytes = serde_json::to_vec(&meta)?;
        let hint = Some(Duration::from_secs(ttl));

        store.set(&self.value_key(key), bytes, hint)?;
        if let Err(e) = store.set(&self.meta_key(key), meta_bytes, hint) {
            if let Err(rollback) = store.delete(&self.value_key(key)) {
                warn!("Failed to roll back value record for '{}': {}", key, rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Removes the value record first so a failure leaves only metadata,
    /// which reads already treat as absent.
    fn remove_records(&self, store: &mut S, key: &str) -> Result<()> {
        store.delete(&self.value_key(key))?;
        store.delete(&self.meta_key(key))
    }

    /// Lazily evicts `key` if it is still stale once the write lock is held.
    async fn evict_if_stale(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if let Probe::Stale { expired } = self.probe(&*store, key, self.clock.now())? {
            self.discard_stale(&mut *store, key, expired)?;
        }
        Ok(())
    }

    /// Removes a stale entry; only expired ones count as evictions.
    fn discard_stale(&self, store: &mut S, key: &str, expired: bool) -> Result<()> {
        self.remove_records(store, key)?;
        if expired {
            self.stats.record_evictions(1);
            debug!("Evicted expired key '{}'", key);
        }
        Ok(())
    }

    /// Rewrites the metadata of a live entry with a fresh TTL window.
    fn write_refreshed(
        &self,
        store: &mut S,
        meta: &EntryMeta,
        now: DateTime<Utc>,
        ttl: u64,
    ) -> Result<EntryMeta> {
        let refreshed = meta.refreshed(now, ttl);
        store.set(
            &self.meta_key(&meta.key),
            serde_json::to_vec(&refreshed)?,
            Some(Duration::from_secs(ttl)),
        )?;
        Ok(refreshed)
    }

    fn join_flight(&self, key: &str) -> FlightTicket<'_> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        let flight = inflight.entry(key.to_string()).or_default();
        flight.waiters += 1;
        FlightTicket {
            inflight: &self.inflight,
            key: key.to_string(),
            lock: Arc::clone(&flight.lock),
        }
    }
}

impl<S: KvStore, C: Codec> Drop for TtlCache<S, C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.store.get_mut().close() {
            warn!("Failed to release store of cache namespace '{}': {}", self.namespace, err);
        }
    }
}

impl<S: KvStore, C: Codec> std::fmt::Debug for TtlCache<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// == Validation ==
/// Rejects empty keys and keys longer than [`MAX_KEY_LENGTH`] bytes.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Rejects a TTL of zero or above [`MAX_TTL_SECONDS`].
pub fn validate_ttl(ttl: u64) -> Result<()> {
    if ttl == 0 {
        return Err(CacheError::InvalidRequest("TTL must be at least 1 second".to_string()));
    }
    if ttl > MAX_TTL_SECONDS {
        return Err(CacheError::InvalidRequest(format!(
            "TTL exceeds maximum of {} seconds",
            MAX_TTL_SECONDS
        )));
    }
    Ok(())
}
