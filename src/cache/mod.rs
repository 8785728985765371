//! Cache Module
//!
//! Provides a TTL cache over a pluggable key-value store, with lazy
//! expiration, cache-aside loading and hit/miss statistics.

mod entry;
mod stats;
mod ttl_cache;


// Re-export public types
pub use entry::{CacheEntry, EntryMeta, EntrySource};
pub use stats::{hit_rate_percent, CacheStats, StatsCounters};
pub use ttl_cache::{validate_key, validate_ttl, TtlCache};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed TTL in seconds (ten years)
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Prefix of the metadata records kept beside each value
pub const META_PREFIX: &str = "meta";

/// Namespace used by the general-purpose cache
pub const DEFAULT_NAMESPACE: &str = "cache";
