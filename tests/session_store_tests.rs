//! Integration Tests for the library API
//!
//! Drives the cache and session store through a store shared between
//! instances, the way a process restart over a persistent store would.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cache_layer::clock::ManualClock;
use cache_layer::{
    CacheConfig, CacheError, KvStore, Result, SessionConfig, SessionStore, TtlCache,
};
use serde_json::{json, Map, Value};

// == Helper Types ==

/// Store whose contents outlive any one cache instance.
#[derive(Clone, Default)]
struct SharedStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl SharedStore {
    fn raw_keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }
}

impl KvStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Vec<u8>, _expire_hint: Option<Duration>) -> Result<()> {
        self.data.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn open_sessions(store: &SharedStore, clock: &ManualClock) -> SessionStore<SharedStore> {
    SessionStore::open_with_clock(store.clone(), SessionConfig::new(60), Arc::new(clock.clone()))
        .await
        .unwrap()
}

// == Session Store Tests ==

#[tokio::test]
async fn test_reopen_rebuilds_user_index() {
    let store = SharedStore::default();
    let clock = ManualClock::default();

    let first = open_sessions(&store, &clock).await;
    let a = first.create_session("user:1").await.unwrap();
    let b = first
        .create_session_with("user:1", fields(json!({"theme": "dark"})))
        .await
        .unwrap();
    let c = first.create_session("user:2").await.unwrap();
    drop(first);

    let second = open_sessions(&store, &clock).await;

    let mut expected = vec![a, b.clone()];
    expected.sort();
    assert_eq!(second.get_user_sessions("user:1").await.unwrap(), expected);
    assert_eq!(second.get_user_sessions("user:2").await.unwrap(), vec![c]);

    let session = second.get_session(&b).await.unwrap().unwrap();
    assert_eq!(session.data["theme"], "dark");
}

#[tokio::test]
async fn test_reopen_skips_expired_sessions() {
    let store = SharedStore::default();
    let clock = ManualClock::default();

    let first = open_sessions(&store, &clock).await;
    first.create_session("user:1").await.unwrap();
    drop(first);

    clock.advance_secs(61);
    let second = open_sessions(&store, &clock).await;

    assert!(second.get_user_sessions("user:1").await.unwrap().is_empty());
    assert_eq!(second.get_stats().await.unwrap().total_sessions, 0);
}

#[tokio::test]
async fn test_session_idle_window() {
    let store = SharedStore::default();
    let clock = ManualClock::default();
    let sessions = open_sessions(&store, &clock).await;

    let id = sessions.create_session("user:1").await.unwrap();

    // Reads inside the window keep the session alive
    for _ in 0..5 {
        clock.advance_secs(50);
        assert!(sessions.get_session(&id).await.unwrap().is_some());
    }

    clock.advance_secs(60);
    assert!(sessions.get_session(&id).await.unwrap().is_none());
    assert!(sessions.get_user_sessions("user:1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_sessions_visible_across_stores() {
    let store = SharedStore::default();
    let clock = ManualClock::default();

    // Opened before any session exists, so its index starts empty
    let reader = open_sessions(&store, &clock).await;
    let writer = open_sessions(&store, &clock).await;

    let a = writer.create_session("user:1").await.unwrap();
    let b = writer.create_session("user:1").await.unwrap();
    writer.create_session("user:2").await.unwrap();

    let mut expected = vec![a.clone(), b];
    expected.sort();
    assert_eq!(reader.get_user_sessions("user:1").await.unwrap(), expected);
    assert_eq!(reader.get_stats().await.unwrap().indexed_users, 1);

    // Adopted sessions are pruned like any other once they go away
    writer.delete_session(&a).await.unwrap();
    let remaining = reader.get_user_sessions("user:1").await.unwrap();
    assert!(!remaining.contains(&a));
    assert_eq!(remaining.len(), 1);

    assert!(reader.get_user_sessions("user:3").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_and_cache_share_a_store() {
    let store = SharedStore::default();
    let clock = ManualClock::default();

    let cache = TtlCache::open(store.clone(), CacheConfig::new("cache", 300))
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    let sessions = open_sessions(&store, &clock).await;

    cache.set("user:1", &json!({"name": "Ada"}), None).await.unwrap();
    let id = sessions.create_session("user:1").await.unwrap();

    // Namespaces keep the two apart
    assert_eq!(cache.get_stats().await.unwrap().total_keys, 1);
    assert_eq!(sessions.get_stats().await.unwrap().total_sessions, 1);
    assert!(cache.get::<Value>(&id).await.unwrap().is_none());

    let keys = store.raw_keys();
    assert!(keys.contains(&"cache:user:1".to_string()));
    assert!(keys.contains(&format!("session:{}", id)));
    assert!(keys.contains(&format!("meta:session:{}", id)));
}

// == Cache-Aside Tests ==

#[derive(Debug)]
enum FetchError {
    Upstream(String),
    Cache(CacheError),
}

impl From<CacheError> for FetchError {
    fn from(err: CacheError) -> Self {
        FetchError::Cache(err)
    }
}

#[tokio::test]
async fn test_get_or_load_reads_through_once() {
    let clock = ManualClock::default();
    let cache = TtlCache::open(SharedStore::default(), CacheConfig::new("cache", 300))
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    let loaded: std::result::Result<Value, FetchError> = cache
        .get_or_load("user:42", || async { Ok(json!({"id": 42})) }, Some(30))
        .await;
    assert_eq!(loaded.unwrap(), json!({"id": 42}));

    // Served from the cache; the loader would fail if it ran
    let cached: std::result::Result<Value, FetchError> = cache
        .get_or_load(
            "user:42",
            || async { Err(FetchError::Upstream("unreachable".into())) },
            Some(30),
        )
        .await;
    assert_eq!(cached.unwrap(), json!({"id": 42}));

    clock.advance_secs(30);
    let failed: std::result::Result<Value, FetchError> = cache
        .get_or_load(
            "user:42",
            || async { Err(FetchError::Upstream("db down".into())) },
            Some(30),
        )
        .await;
    assert!(matches!(failed, Err(FetchError::Upstream(msg)) if msg == "db down"));
    assert!(!cache.contains("user:42").await.unwrap());
}
