//! Reverse index from users to their sessions.

use std::collections::{BTreeSet, HashMap};

/// `user_id -> {session_id}` plus the inverse `session_id -> user_id`.
///
/// The index is derived state: the session records in the cache are the
/// source of truth and the index is pruned whenever a dead id is found.
#[derive(Debug, Default)]
pub struct SessionIndex {
    by_user: HashMap<String, BTreeSet<String>>,
    owner: HashMap<String, String>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `session_id` as belonging to `user_id`.
    pub fn insert(&mut self, user_id: &str, session_id: &str) {
        if let Some(previous) = self.owner.insert(session_id.to_string(), user_id.to_string()) {
            if previous != user_id {
                self.detach(&previous, session_id);
            }
        }
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    /// Drops `session_id`; returns its owner if it was indexed.
    pub fn remove(&mut self, session_id: &str) -> Option<String> {
        let user_id = self.owner.remove(session_id)?;
        self.detach(&user_id, session_id);
        Some(user_id)
    }

    /// Session ids indexed for `user_id`, in ascending order.
    pub fn sessions_of(&self, user_id: &str) -> Vec<String> {
        self.by_user
            .get(user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every indexed session id.
    pub fn session_ids(&self) -> Vec<String> {
        self.owner.keys().cloned().collect()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.owner.contains_key(session_id)
    }

    /// Number of users with at least one indexed session.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_user.clear();
        self.owner.clear();
    }

    fn detach(&mut self, user_id: &str, session_id: &str) {
        if let Some(ids) = self.by_user.get_mut(user_id) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_user.remove(user_id);
            }
        }
    }
}
