//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheEntry;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

impl GetResponse {
    /// Creates a GetResponse from a live cache entry
    pub fn from_entry(entry: CacheEntry<Value>) -> Self {
        Self {
            expires_at: entry.meta.expires_at,
            key: entry.meta.key,
            value: entry.value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for POST /warm
#[derive(Debug, Clone, Serialize)]
pub struct WarmResponse {
    pub message: String,
    /// Number of entries written
    pub count: usize,
}

impl WarmResponse {
    pub fn new(count: usize) -> Self {
        Self {
            message: format!("Warmed {} entries", count),
            count,
        }
    }
}

/// Response body for the sweep endpoints
/// (POST /clear-expired, POST /sessions/cleanup)
#[derive(Debug, Clone, Serialize)]
pub struct ClearExpiredResponse {
    /// Number of expired entries removed
    pub removed: usize,
}

impl ClearExpiredResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for POST /sessions
#[derive(Debug, Clone, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub user_id: String,
    /// Session TTL in seconds
    pub ttl: u64,
}

impl SessionCreatedResponse {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, ttl: u64) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            ttl,
        }
    }
}

/// Response body for PATCH and DELETE on /sessions/:id
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub session_id: String,
}

impl SessionResponse {
    pub fn updated(session_id: impl Into<String>) -> Self {
        Self::with_message(session_id.into(), "updated")
    }

    pub fn deleted(session_id: impl Into<String>) -> Self {
        Self::with_message(session_id.into(), "deleted")
    }

    fn with_message(session_id: String, action: &str) -> Self {
        Self {
            message: format!("Session {} successfully", action),
            session_id,
        }
    }
}

/// Response body for GET /users/:user_id/sessions
#[derive(Debug, Clone, Serialize)]
pub struct UserSessionsResponse {
    pub user_id: String,
    /// Live session ids, in ascending order
    pub sessions: Vec<String>,
    pub count: usize,
}

impl UserSessionsResponse {
    pub fn new(user_id: impl Into<String>, sessions: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            count: sessions.len(),
            sessions,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EntryMeta, EntrySource};
    use serde_json::json;

    #[test]
    fn test_get_response_from_entry() {
        let now = Utc::now();
        let entry = CacheEntry {
            value: json!({"x": 1}),
            meta: EntryMeta::new("test_key", now, 60, 7, EntrySource::Set),
        };

        let resp = GetResponse::from_entry(entry);
        assert_eq!(resp.key, "test_key");
        assert_eq!(resp.expires_at, now + chrono::Duration::seconds(60));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["value"], json!({"x": 1}));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_serialize() {
        let resp = DeleteResponse::new("deleted_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("deleted_key"));
        assert!(json.contains("deleted"));
    }

    #[test]
    fn test_warm_response_count() {
        let resp = WarmResponse::new(3);
        assert_eq!(resp.count, 3);
        assert!(resp.message.contains('3'));
    }

    #[test]
    fn test_session_response_messages() {
        assert_eq!(SessionResponse::updated("s").message, "Session updated successfully");
        assert_eq!(SessionResponse::deleted("s").message, "Session deleted successfully");
    }

    #[test]
    fn test_user_sessions_count() {
        let resp = UserSessionsResponse::new("user:1", vec!["a".into(), "b".into()]);
        assert_eq!(resp.count, 2);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
