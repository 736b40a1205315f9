use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// Key under which the planner leaves the trip for the vehicle selection view.
pub const TRIP_DATA_KEY: &str = "tripData";

const IDLE_TIMEOUT_MINUTES: i64 = 30;

struct BrowserSession {
    entries: HashMap<String, Value>,
    last_touched: DateTime<Utc>,
}

/// Per-browser-session scratch space. A session untouched for longer than
/// the idle timeout is dropped.
pub struct SessionStorage {
    sessions: DashMap<String, BrowserSession>,
    idle_timeout: Duration,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::with_idle_timeout(Duration::minutes(IDLE_TIMEOUT_MINUTES))
    }
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn set(&self, session_id: &str, key: &str, value: Value) {
        self.set_at(session_id, key, value, Utc::now());
    }

    pub fn get(&self, session_id: &str, key: &str) -> Option<Value> {
        self.get_at(session_id, key, Utc::now())
    }

    pub fn remove(&self, session_id: &str, key: &str) -> Option<Value> {
        let mut session = self.sessions.get_mut(session_id)?;
        session.last_touched = Utc::now();
        session.entries.remove(key)
    }

    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drops every session idle past the timeout. Returns how many went.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now - session.last_touched <= self.idle_timeout);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn set_at(&self, session_id: &str, key: &str, value: Value, now: DateTime<Utc>) {
        self.evict_idle(now);

        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| BrowserSession {
                entries: HashMap::new(),
                last_touched: now,
            });
        session.last_touched = now;
        session.entries.insert(key.to_string(), value);
    }

    fn get_at(&self, session_id: &str, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let mut session = self.sessions.get_mut(session_id)?;
        if now - session.last_touched > self.idle_timeout {
            // the shard lock must be released before removing
            drop(session);
            self.sessions.remove(session_id);
            return None;
        }

        session.last_touched = now;
        session.entries.get(key).cloned()
    }
}
