//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use crate::cache::{CacheStats, TtlCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearExpiredResponse, CreateSessionRequest, DeleteResponse, GetResponse, HealthResponse,
    SessionCreatedResponse, SessionResponse, SetRequest, SetResponse, UpdateSessionRequest,
    UserSessionsResponse, WarmRequest, WarmResponse,
};
use crate::session::{Session, SessionStore};
use crate::store::MemoryStore;

/// Application state shared across all handlers.
///
/// Both components synchronise internally, so handlers share them through
/// plain `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// General-purpose TTL cache
    pub cache: Arc<TtlCache<MemoryStore>>,
    /// Session store
    pub sessions: Arc<SessionStore<MemoryStore>>,
}

impl AppState {
    /// Creates a new AppState from an opened cache and session store.
    pub fn new(cache: TtlCache<MemoryStore>, sessions: SessionStore<MemoryStore>) -> Self {
        Self {
            cache: Arc::new(cache),
            sessions: Arc::new(sessions),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Each component gets its own in-memory store sized by the capacity hint.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = TtlCache::open(
            MemoryStore::with_capacity_hint(config.capacity_hint),
            config.cache_config(),
        )?;
        let sessions = SessionStore::open(
            MemoryStore::with_capacity_hint(config.capacity_hint),
            config.session_config(),
        )
        .await?;
        Ok(Self::new(cache, sessions))
    }

    /// Closes both stores once no other handle to them is left.
    ///
    /// A component still shared elsewhere is released when its last handle
    /// drops instead.
    pub async fn close(self) -> Result<()> {
        let Self { cache, sessions } = self;

        match Arc::try_unwrap(cache) {
            Ok(cache) => cache.close().await?,
            Err(_) => warn!("Cache still shared at shutdown, releasing on last drop"),
        }
        match Arc::try_unwrap(sessions) {
            Ok(sessions) => sessions.close().await?,
            Err(_) => warn!("Session store still shared at shutdown, releasing on last drop"),
        }
        Ok(())
    }
}

// == Cache Handlers ==

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set(&req.key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Absent and expired keys answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    state
        .cache
        .get_entry::<Value>(&key)
        .await?
        .map(|entry| Json(GetResponse::from_entry(entry)))
        .ok_or_else(|| CacheError::NotFound(format!("Key '{}' not found", key)))
}

/// Handler for DELETE /del/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /warm
pub async fn warm_handler(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<Json<WarmResponse>> {
    let count = state.cache.warm_cache(req.entries, req.ttl).await?;

    Ok(Json(WarmResponse::new(count)))
}

/// Handler for POST /clear-expired
pub async fn clear_expired_handler(
    State(state): State<AppState>,
) -> Result<Json<ClearExpiredResponse>> {
    let removed = state.cache.clear_expired().await?;

    Ok(Json(ClearExpiredResponse::new(removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    Ok(Json(state.cache.get_stats().await?))
}

// == Session Handlers ==

/// Handler for POST /sessions
pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionCreatedResponse>)> {
    let session_id = state
        .sessions
        .create_session_with(&req.user_id, req.data)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse::new(
            session_id,
            req.user_id,
            state.sessions.ttl(),
        )),
    ))
}

/// Handler for GET /sessions/:id
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>> {
    state
        .sessions
        .get_session(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| CacheError::NotFound("Session not found".to_string()))
}

/// Handler for PATCH /sessions/:id
pub async fn update_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>> {
    if !state.sessions.update_session(&session_id, req.data).await? {
        return Err(CacheError::NotFound("Session not found".to_string()));
    }

    Ok(Json(SessionResponse::updated(session_id)))
}

/// Handler for DELETE /sessions/:id
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>> {
    state.sessions.delete_session(&session_id).await?;

    Ok(Json(SessionResponse::deleted(session_id)))
}

/// Handler for POST /sessions/cleanup
pub async fn cleanup_sessions_handler(
    State(state): State<AppState>,
) -> Result<Json<ClearExpiredResponse>> {
    let removed = state.sessions.cleanup_expired_sessions().await?;

    Ok(Json(ClearExpiredResponse::new(removed)))
}

/// Handler for GET /users/:user_id/sessions
pub async fn user_sessions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserSessionsResponse>> {
    let sessions = state.sessions.get_user_sessions(&user_id).await?;

    Ok(Json(UserSessionsResponse::new(user_id, sessions)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
