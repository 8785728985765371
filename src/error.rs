//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// An absent key is never an error inside the library (reads return
/// `Option`); `NotFound` only exists for the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key or session not found (HTTP surface only)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data (bad key, zero TTL, malformed body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The key-value collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value or metadata record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Storage(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::Serialization(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            CacheError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let cache_err: CacheError = err.into();
        assert!(matches!(cache_err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("k".into()), StatusCode::BAD_REQUEST),
            (CacheError::Storage("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Serialization("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::Internal("oops".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
