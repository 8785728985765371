//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Lock-free counters shared by every caller of a cache.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    // == Constructor ==
    /// Creates counters starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` to the write counter.
    pub fn record_writes(&self, count: u64) {
        self.writes.fetch_add(count, Ordering::Relaxed);
    }

    /// Increments the explicit delete counter.
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    /// Adds `count` to the expiry eviction counter.
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Takes a snapshot, filling in the storage-derived fields.
    pub fn snapshot(&self, total_keys: usize, total_size_bytes: usize) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            hit_rate_percent: hit_rate_percent(hits, misses),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_keys,
            total_size_bytes,
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key absent or expired)
    pub misses: u64,
    /// `100 * hits / (hits + misses)`, or `0.0` before any lookup
    pub hit_rate_percent: f64,
    /// Number of entries written (set, loaded, warmed)
    pub writes: u64,
    /// Number of explicit deletes that removed an entry
    pub deletes: u64,
    /// Number of entries removed because they expired
    pub evictions: u64,
    /// Records physically present in storage, expired or not
    pub total_keys: usize,
    /// Sum of encoded value sizes of those records
    pub total_size_bytes: usize,
}

// == Hit Rate ==
/// Calculates the hit rate as a percentage.
///
/// Returns `100 * hits / (hits + misses)`, or 0.0 if no lookups have been made.
pub fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}
