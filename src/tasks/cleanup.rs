//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries and
//! sessions. Reads already hide expired entries; the sweep reclaims storage.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::session::SessionStore;
use crate::store::KvStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// Each run calls `clear_expired` on the cache and
/// `cleanup_expired_sessions` on the session store. A failed run is logged
/// and the task keeps going.
///
/// # Arguments
/// * `cache` - shared general-purpose cache
/// * `sessions` - shared session store
/// * `cleanup_interval_secs` - Interval in seconds between runs, must be non-zero
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(state.cache.clone(), state.sessions.clone(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<S, T>(
    cache: Arc<TtlCache<S>>,
    sessions: Arc<SessionStore<T>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()>
where
    S: KvStore,
    T: KvStore,
{
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.clear_expired().await {
                Ok(0) => debug!("Cache sweep: no expired entries found"),
                Ok(removed) => info!("Cache sweep: removed {} expired entries", removed),
                Err(err) => warn!("Cache sweep failed: {}", err),
            }

            match sessions.cleanup_expired_sessions().await {
                Ok(0) => debug!("Session sweep: no expired sessions found"),
                Ok(removed) => info!("Session sweep: removed {} expired sessions", removed),
                Err(err) => warn!("Session sweep failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{CacheConfig, SessionConfig};
    use crate::store::MemoryStore;

    async fn fixtures(
        clock: &ManualClock,
    ) -> (Arc<TtlCache<MemoryStore>>, Arc<SessionStore<MemoryStore>>) {
        let cache = TtlCache::open(MemoryStore::new(), CacheConfig::new("cache", 300))
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        let sessions = SessionStore::open_with_clock(
            MemoryStore::new(),
            SessionConfig::new(60),
            Arc::new(clock.clone()),
        )
        .await
        .unwrap();
        (Arc::new(cache), Arc::new(sessions))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::default();
        let (cache, sessions) = fixtures(&clock).await;

        cache.set("expire_soon", "value", Some(1)).await.unwrap();
        sessions.create_session("user:1").await.unwrap();
        clock.advance_secs(120);

        let handle = spawn_cleanup_task(cache.clone(), sessions.clone(), 1);

        // Wait for at least one sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.evictions, 1, "Expired entry should have been swept");
        assert_eq!(stats.total_keys, 0);

        let session_stats = sessions.get_stats().await.unwrap();
        assert_eq!(session_stats.total_sessions, 0);
        assert_eq!(session_stats.indexed_users, 0);
        assert_eq!(session_stats.cache.total_keys, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let clock = ManualClock::default();
        let (cache, sessions) = fixtures(&clock).await;

        cache.set("long_lived", "value", Some(3600)).await.unwrap();
        let session_id = sessions.create_session("user:1").await.unwrap();

        let handle = spawn_cleanup_task(cache.clone(), sessions.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let value: Option<String> = cache.get("long_lived").await.unwrap();
        assert_eq!(value.as_deref(), Some("value"), "Valid entry should not be removed");
        assert!(sessions.get_session(&session_id).await.unwrap().is_some());
        assert_eq!(cache.get_stats().await.unwrap().evictions, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let clock = ManualClock::default();
        let (cache, sessions) = fixtures(&clock).await;

        let handle = spawn_cleanup_task(cache, sessions, 1);

        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
