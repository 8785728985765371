//! Session Module
//!
//! Session storage built on the TTL cache: random session ids, sliding
//! expiration and a user to sessions reverse index.

mod index;
mod record;
mod store;

pub use index::SessionIndex;
pub use record::{generate_session_id, Session, SessionRecord, SESSION_ID_BYTES};
pub use store::{SessionStats, SessionStore};

/// Namespace the session records live under
pub const SESSION_NAMESPACE: &str = "session";
