//! Session Store Module
//!
//! TTL cache specialised for web sessions, with a self-healing reverse index
//! from users to their sessions.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, TtlCache};
use crate::clock::{Clock, SystemClock};
use crate::codec::JsonCodec;
use crate::config::SessionConfig;
use crate::error::{CacheError, Result};
use crate::session::{generate_session_id, Session, SessionIndex, SessionRecord};
use crate::store::KvStore;

// == Session Stats ==
/// Point-in-time view of the session store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    /// Sessions that are currently live
    pub total_sessions: usize,
    /// Users with at least one indexed session
    pub indexed_users: usize,
    /// Statistics of the backing cache
    pub cache: CacheStats,
}

// == Session Store ==
/// Session storage with sliding expiration.
///
/// Creates, updates, deletes and sweeps hold the index lock across the cache
/// write, so the index never points at a session removed through this store.
/// Reads run without it and prune any dead id they come across.
///
/// The index only learns about sessions written by other stores over the
/// same collaborator when it is rebuilt, or when a user it has no entry for
/// is listed. A user already indexed here sees only the sessions this store
/// knows of until [`SessionStore::rebuild_index`] runs.
pub struct SessionStore<S: KvStore> {
    cache: TtlCache<S>,
    index: RwLock<SessionIndex>,
    config: SessionConfig,
}

impl<S: KvStore> SessionStore<S> {
    // == Constructor ==
    /// Opens a session store over `store` and rebuilds the reverse index from
    /// the sessions already in it.
    pub async fn open(store: S, config: SessionConfig) -> Result<Self> {
        Self::open_with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Opens a session store driven by `clock`.
    pub async fn open_with_clock(
        store: S,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let cache = TtlCache::open_with(store, config.cache_config(), JsonCodec, clock)?;
        let sessions = Self {
            cache,
            index: RwLock::new(SessionIndex::new()),
            config,
        };
        sessions.rebuild_index().await?;
        Ok(sessions)
    }

    /// Session TTL in seconds.
    pub fn ttl(&self) -> u64 {
        self.config.ttl
    }

    /// Re-derives the reverse index from the live sessions in storage.
    ///
    /// Returns the number of sessions indexed.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let mut index = self.index.write().await;
        let records = self.cache.entries::<SessionRecord>().await?;

        index.clear();
        for entry in &records {
            index.insert(&entry.value.user_id, &entry.value.session_id);
        }

        info!(
            "Session index rebuilt: {} sessions for {} users",
            records.len(),
            index.user_count()
        );
        Ok(records.len())
    }

    // == Create ==
    /// Creates an empty session for `user_id` and returns its id.
    pub async fn create_session(&self, user_id: &str) -> Result<String> {
        self.create_session_with(user_id, Map::new()).await
    }

    /// Creates a session for `user_id` holding `data`.
    pub async fn create_session_with(&self, user_id: &str, data: Map<String, Value>) -> Result<String> {
        if user_id.is_empty() {
            return Err(CacheError::InvalidRequest("User id cannot be empty".to_string()));
        }

        let session_id = generate_session_id();
        let record = SessionRecord::new(&session_id, user_id, self.cache.now(), data);

        let mut index = self.index.write().await;
        self.cache.set(&session_id, &record, Some(self.config.ttl)).await?;
        index.insert(user_id, &session_id);

        debug!("Created session for user '{}'", user_id);
        Ok(session_id)
    }

    // == Get ==
    /// Returns a live session, or `None` if it is unknown or expired.
    ///
    /// With sliding reads enabled, a hit restarts the session's TTL window.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let entry = if self.config.sliding_on_read {
            self.cache
                .get_and_touch::<SessionRecord>(session_id, Some(self.config.ttl))
                .await?
        } else {
            self.cache.get_entry::<SessionRecord>(session_id).await?
        };

        match entry {
            Some(entry) => Ok(Some(into_session(entry))),
            None => {
                self.prune([session_id.to_string()]).await?;
                Ok(None)
            }
        }
    }

    // == Update ==
    /// Merges `fields` into the session data and restarts its TTL window.
    ///
    /// Returns `false` without error if the session does not exist.
    pub async fn update_session(&self, session_id: &str, fields: Map<String, Value>) -> Result<bool> {
        let mut index = self.index.write().await;

        let Some(entry) = self.cache.get_entry::<SessionRecord>(session_id).await? else {
            index.remove(session_id);
            return Ok(false);
        };

        let mut record = entry.value;
        record.merge(fields);
        self.cache.set(session_id, &record, Some(self.config.ttl)).await?;

        debug!("Updated session for user '{}'", record.user_id);
        Ok(true)
    }

    // == User Sessions ==
    /// Returns the ids of a user's live sessions, in ascending order.
    ///
    /// Ids whose session has gone away are pruned from the index. A user the
    /// index does not know is looked up in storage, which picks up sessions
    /// written through another store over the same collaborator.
    pub async fn get_user_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        let mut candidates = self.index.read().await.sessions_of(user_id);
        if candidates.is_empty() {
            candidates = self.adopt_user_sessions(user_id).await?;
        }

        let mut live = Vec::with_capacity(candidates.len());
        let mut dead = Vec::new();
        for session_id in candidates {
            if self.cache.contains(&session_id).await? {
                live.push(session_id);
            } else {
                dead.push(session_id);
            }
        }

        if !dead.is_empty() {
            self.prune(dead).await?;
        }
        Ok(live)
    }

    // == Delete ==
    /// Removes a session and its index membership. Idempotent.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut index = self.index.write().await;
        self.cache.delete(session_id).await?;
        index.remove(session_id);
        Ok(())
    }

    // == Cleanup ==
    /// Sweeps expired sessions and prunes index references that no longer
    /// resolve. Returns the number of sessions the sweep removed.
    pub async fn cleanup_expired_sessions(&self) -> Result<usize> {
        let mut index = self.index.write().await;

        let expired = self.cache.sweep_expired().await?;
        for session_id in &expired {
            index.remove(session_id);
        }

        let mut dangling = 0usize;
        for session_id in index.session_ids() {
            if !self.cache.contains(&session_id).await? {
                index.remove(&session_id);
                dangling += 1;
            }
        }

        if !expired.is_empty() || dangling > 0 {
            info!(
                "Session cleanup: removed {} expired sessions, pruned {} dangling index entries",
                expired.len(),
                dangling
            );
        }
        Ok(expired.len())
    }

    // == Stats ==
    /// Returns session store statistics.
    pub async fn get_stats(&self) -> Result<SessionStats> {
        let total_sessions = self.cache.entries::<SessionRecord>().await?.len();
        let indexed_users = self.index.read().await.user_count();
        let cache = self.cache.get_stats().await?;

        Ok(SessionStats {
            total_sessions,
            indexed_users,
            cache,
        })
    }

    /// Closes the underlying store, consuming the session store.
    pub async fn close(self) -> Result<()> {
        self.cache.close().await
    }

    /// Scans storage for `user_id`'s live sessions and indexes them.
    async fn adopt_user_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        let mut index = self.index.write().await;

        let mut adopted = Vec::new();
        for entry in self.cache.entries::<SessionRecord>().await? {
            if entry.value.user_id == user_id {
                index.insert(user_id, &entry.value.session_id);
                adopted.push(entry.value.session_id);
            }
        }

        if !adopted.is_empty() {
            debug!("Indexed {} stored sessions for user '{}'", adopted.len(), user_id);
        }
        Ok(adopted)
    }

    /// Removes ids from the index once they are confirmed dead.
    ///
    /// The re-check under the index lock keeps a session that an update just
    /// re-wrote from being dropped.
    async fn prune<I>(&self, session_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = self.index.write().await;
        for session_id in session_ids {
            if index.contains(&session_id) && !self.cache.contains(&session_id).await? {
                index.remove(&session_id);
                debug!("Pruned dead session from index");
            }
        }
        Ok(())
    }
}

impl<S: KvStore> std::fmt::Debug for SessionStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn into_session(entry: CacheEntry<SessionRecord>) -> Session {
    let (record, meta) = (entry.value, entry.meta);
    Session {
        session_id: record.session_id,
        user_id: record.user_id,
        created_at: record.created_at,
        last_accessed: meta.created_at,
        expires_at: meta.expires_at,
        data: record.data,
    }
}
