//! Session records and identifiers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of random bytes in a session id (256 bits).
pub const SESSION_ID_BYTES: usize = 32;

/// Generates a fresh session id.
///
/// Returns 32 random bytes as URL-safe base64 without padding (43 characters).
pub fn generate_session_id() -> String {
    let bytes: [u8; SESSION_ID_BYTES] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Session payload as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl SessionRecord {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            created_at,
            data,
        }
    }

    /// Shallow-merges `fields` into the session data; later keys win.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        self.data.extend(fields);
    }
}

/// A live session as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Opaque session identifier
    pub session_id: String,
    /// Owner of the session
    pub user_id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time the TTL window was restarted
    pub last_accessed: DateTime<Utc>,
    /// When the session expires unless refreshed
    pub expires_at: DateTime<Utc>,
    /// Application data
    pub data: Map<String, Value>,
}
