//! Cache Entry Module
//!
//! Defines cache entries and the metadata record stored beside each value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// == Entry Source ==
/// How an entry got into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Written by `set` or a refresh
    Set,
    /// Stored by `get_or_load` after a miss
    Loaded,
    /// Preloaded by `warm_cache`
    Warmed,
}

// == Entry Metadata ==
/// Bookkeeping record stored under the entry's metadata key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// The caller-visible key
    pub key: String,
    /// When the entry was last written
    pub created_at: DateTime<Utc>,
    /// When the entry stops being visible
    pub expires_at: DateTime<Utc>,
    /// TTL in seconds the entry was written with
    pub ttl: u64,
    /// Size of the encoded value in bytes
    pub size_bytes: usize,
    /// Where the value came from
    pub source: EntrySource,
}

impl EntryMeta {
    // == Constructor ==
    /// Creates metadata for an entry written at `now` with `ttl_seconds`.
    pub fn new(
        key: impl Into<String>,
        now: DateTime<Utc>,
        ttl_seconds: u64,
        size_bytes: usize,
        source: EntrySource,
    ) -> Self {
        Self {
            key: key.into(),
            created_at: now,
            expires_at: expiry_after(now, ttl_seconds),
            ttl: ttl_seconds,
            size_bytes,
            source,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: the entry is expired once `now` reaches
    /// `expires_at`, so a fully elapsed TTL is never visible.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns a copy whose TTL window restarts at `now`.
    pub fn refreshed(&self, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            created_at: now,
            expires_at: expiry_after(now, ttl_seconds),
            ttl: ttl_seconds,
            ..self.clone()
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_milliseconds().max(0) as u64
    }

    /// Returns remaining TTL in whole seconds, `0` once expired.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> u64 {
        self.ttl_remaining_ms(now) / 1000
    }
}

// == Cache Entry ==
/// A live value together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Bookkeeping for the value
    pub meta: EntryMeta,
}

impl<V> CacheEntry<V> {
    /// When the entry stops being visible.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.meta.expires_at
    }
}

/// Returns `now + ttl_seconds`, saturating at the largest representable time.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn meta_at(now: DateTime<Utc>, ttl: u64) -> EntryMeta {
        EntryMeta::new("k", now, ttl, 3, EntrySource::Set)
    }

    #[test]
    fn test_meta_expiry_window() {
        let now = Utc::now();
        let meta = meta_at(now, 10);

        assert_eq!(meta.expires_at, now + Duration::seconds(10));
        assert!(meta.expires_at >= meta.created_at);
        assert!(!meta.is_expired_at(now));
        assert!(!meta.is_expired_at(now + Duration::milliseconds(9_999)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let meta = meta_at(now, 1);

        // Expired exactly when now reaches expires_at
        assert!(meta.is_expired_at(now + Duration::seconds(1)));
        assert!(meta.is_expired_at(now + Duration::seconds(2)));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Utc::now();
        let meta = meta_at(now, 10);

        assert_eq!(meta.ttl_remaining_ms(now), 10_000);
        assert_eq!(meta.ttl_remaining(now + Duration::milliseconds(2_500)), 7);
        assert_eq!(meta.ttl_remaining(now + Duration::seconds(60)), 0);
    }

    #[test]
    fn test_refreshed_keeps_identity() {
        let now = Utc::now();
        let meta = EntryMeta::new("user:1", now, 5, 42, EntrySource::Loaded);

        let later = now + Duration::seconds(4);
        let refreshed = meta.refreshed(later, 5);

        assert_eq!(refreshed.key, "user:1");
        assert_eq!(refreshed.size_bytes, 42);
        assert_eq!(refreshed.source, EntrySource::Loaded);
        assert_eq!(refreshed.created_at, later);
        assert_eq!(refreshed.expires_at, later + Duration::seconds(5));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let now = Utc::now();
        let meta = meta_at(now, u64::MAX);

        assert_eq!(meta.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(meta.expires_at >= meta.created_at);
        assert!(!meta.is_expired_at(now));
    }

    #[test]
    fn test_meta_json_shape() {
        let meta = meta_at(Utc::now(), 60);
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["key"], "k");
        assert_eq!(json["ttl"], 60);
        assert_eq!(json["source"], "set");
        assert!(json["expires_at"].is_string());
    }
}
