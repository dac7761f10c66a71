//! Last-access bookkeeping for TTL expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Records when each key was last touched and answers "has it gone stale?".
#[derive(Debug)]
pub struct TtlTracker {
    touched: HashMap<String, Instant>,
    ttl: Option<Duration>,
}

impl TtlTracker {
    /// Create a tracker. `None` disables expiry entirely.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            touched: HashMap::new(),
            ttl,
        }
    }

    /// Mark `key` as accessed now.
    pub fn touch(&mut self, key: &str) {
        self.touched.insert(key.to_string(), Instant::now());
    }

    /// Whether `key` outlived the TTL. Untracked keys count as expired when a TTL is set.
    pub fn is_expired(&self, key: &str) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        self.touched
            .get(key)
            .is_none_or(|last| last.elapsed() > ttl)
    }

    /// Stop tracking `key`.
    pub fn forget(&mut self, key: &str) {
        self.touched.remove(key);
    }

    /// Remove every stale key and return them.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let now = Instant::now();
        let stale: Vec<String> = self
            .touched
            .iter()
            .filter(|(_, last)| now.duration_since(**last) > ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.touched.remove(key);
        }
        stale
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.touched.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.touched.clear();
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}
