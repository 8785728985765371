//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::MAX_KEY_LENGTH;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least 1 second".to_string());
        }
        None
    }
}

/// Request body for POST /warm
#[derive(Debug, Clone, Deserialize)]
pub struct WarmRequest {
    /// Entries to insert, keyed by cache key
    pub entries: Map<String, Value>,
    /// Optional TTL shared by every entry
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for POST /sessions
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    /// Owner of the new session
    pub user_id: String,
    /// Initial session data
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Request body for PATCH /sessions/:id
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSessionRequest {
    /// Fields merged into the session data
    pub data: Map<String, Value>,
}
