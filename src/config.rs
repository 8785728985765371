//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;

use crate::cache::{validate_ttl, DEFAULT_NAMESPACE, META_PREFIX};
use crate::error::{CacheError, Result};
use crate::session::SESSION_NAMESPACE;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Default TTL in seconds for cache entries without explicit TTL
    pub default_ttl: u64,
    /// Session time-to-live in seconds
    pub session_ttl: u64,
    /// Whether reading a session restarts its TTL window
    pub sliding_sessions: bool,
    /// Expected number of records, forwarded to the store
    pub capacity_hint: Option<usize>,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds, 0 disables the sweep
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default cache TTL in seconds (default: 3600)
    /// - `SESSION_TTL` - Session TTL in seconds (default: 3600)
    /// - `SLIDING_SESSIONS` - Restart session TTL on read (default: true)
    /// - `CAPACITY_HINT` - Expected record count for the store (default: unset)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds, 0 disables (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            session_ttl: parse_env("SESSION_TTL").unwrap_or(defaults.session_ttl),
            sliding_sessions: parse_env("SLIDING_SESSIONS").unwrap_or(defaults.sliding_sessions),
            capacity_hint: parse_env("CAPACITY_HINT"),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Configuration for the general-purpose cache.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(DEFAULT_NAMESPACE, self.default_ttl)
    }

    /// Configuration for the session store.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl: self.session_ttl,
            sliding_on_read: self.sliding_sessions,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 3600,
            session_ttl: 3600,
            sliding_sessions: true,
            capacity_hint: None,
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

// == Cache Config ==
/// Settings for one [`crate::cache::TtlCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Record prefix; caches sharing a store must use distinct namespaces
    pub namespace: String,
    /// Default TTL in seconds
    pub default_ttl: u64,
}

impl CacheConfig {
    /// Creates a cache configuration.
    pub fn new(namespace: impl Into<String>, default_ttl: u64) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
        }
    }

    /// Checks the namespace and default TTL.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(CacheError::InvalidRequest(format!(
                "Namespace '{}' must be non-empty and contain no ':'",
                self.namespace
            )));
        }
        if self.namespace == META_PREFIX {
            return Err(CacheError::InvalidRequest(format!(
                "Namespace '{}' is reserved",
                META_PREFIX
            )));
        }
        validate_ttl(self.default_ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Config::default().cache_config()
    }
}

// == Session Config ==
/// Settings for a [`crate::session::SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session time-to-live in seconds
    pub ttl: u64,
    /// Whether a successful read restarts the TTL window
    pub sliding_on_read: bool,
}

impl SessionConfig {
    /// Creates a session configuration with sliding reads enabled.
    pub fn new(ttl: u64) -> Self {
        Self {
            ttl,
            sliding_on_read: true,
        }
    }

    /// Cache configuration backing the session store.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(SESSION_NAMESPACE, self.ttl)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Config::default().session_config()
    }
}
