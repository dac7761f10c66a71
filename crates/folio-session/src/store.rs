//! The session store itself.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Result, SessionError};
use crate::ttl::TtlTracker;

struct StoreInner {
    lru: LruCache<String, String>,
    ttl: TtlTracker,
    /// Sum of key and value byte lengths currently held.
    bytes: usize,
}

impl StoreInner {
    fn evict(&mut self, key: &str) -> Option<String> {
        self.ttl.forget(key);
        let value = self.lru.pop(key)?;
        self.bytes = self.bytes.saturating_sub(entry_size(key, &value));
        Some(value)
    }

    /// Drop entries that outlived the TTL. Returns how many were removed.
    fn drain_expired(&mut self) -> usize {
        let stale = self.ttl.drain_expired();
        stale.iter().filter(|key| self.evict(key).is_some()).count()
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// String key/value store scoped to one process run.
///
/// Cloning the handle shares the underlying storage, so a retriever and the
/// CLI driving it see the same entries.
pub struct SessionStore {
    id: Uuid,
    inner: Arc<RwLock<StoreInner>>,
    config: StoreConfig,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        let inner = StoreInner {
            lru: LruCache::new(cap),
            ttl: TtlTracker::new(config.ttl),
            bytes: 0,
        };
        let id = Uuid::new_v4();
        debug!(store_id = %id, max_entries = config.max_entries, max_bytes = config.max_bytes, "Session store created");

        Self {
            id,
            inner: Arc::new(RwLock::new(inner)),
            config,
        }
    }

    /// Identifier of this session, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.lru.len()
    }

    /// True when the store holds nothing.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.lru.is_empty()
    }

    /// Read a value, refreshing its LRU position and TTL.
    ///
    /// Expired entries are dropped on the way and reported as missing.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.write().await;

        if inner.ttl.is_expired(key) {
            if inner.evict(key).is_some() {
                debug!(store_id = %self.id, key, "Entry expired");
            }
            return None;
        }

        let value = inner.lru.get(key).cloned();
        if value.is_some() {
            inner.ttl.touch(key);
            trace!(store_id = %self.id, key, "Session store hit");
        }
        value
    }

    /// Write a value.
    ///
    /// Expired entries and the old value of a replaced key are released
    /// first. When the new total would still exceed `max_bytes` the write is
    /// refused and the live entries are left untouched.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        if key.is_empty() {
            return Err(SessionError::InvalidKey(key.to_string()));
        }
        let value = value.into();
        let requested = entry_size(key, &value);

        let mut inner = self.inner.write().await;
        let expired = inner.drain_expired();
        if expired > 0 {
            debug!(store_id = %self.id, count = expired, "Dropped expired entries");
        }
        let existing = inner.lru.peek(key).map(|old| entry_size(key, old)).unwrap_or(0);
        let available = self.config.max_bytes.saturating_sub(inner.bytes - existing);
        if requested > available {
            return Err(SessionError::QuotaExceeded {
                key: key.to_string(),
                requested,
                available,
            });
        }

        inner.bytes = inner.bytes - existing + requested;
        if let Some((displaced, old)) = inner.lru.push(key.to_string(), value) {
            if displaced != key {
                inner.bytes = inner.bytes.saturating_sub(entry_size(&displaced, &old));
                inner.ttl.forget(&displaced);
                debug!(store_id = %self.id, key = %displaced, "Evicting least recently used entry");
            }
        }
        inner.ttl.touch(key);

        trace!(store_id = %self.id, key, bytes = inner.bytes, "Session store write");
        Ok(())
    }

    /// Remove a key, returning its value if present.
    pub async fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().await.evict(key)
    }

    /// Whether a live entry exists, without touching LRU order or TTL.
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner.lru.contains(key) && !inner.ttl.is_expired(key)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.lru.clear();
        inner.ttl.clear();
        inner.bytes = 0;
    }

    /// Usage snapshot.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;
        StoreStats {
            entries: inner.lru.len(),
            capacity: self.config.max_entries,
            bytes: inner.bytes,
            max_bytes: self.config.max_bytes,
        }
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Store usage statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Live entries.
    pub entries: usize,

    /// Maximum entries before eviction.
    pub capacity: usize,

    /// Bytes currently held (keys plus values).
    pub bytes: usize,

    /// Byte quota.
    pub max_bytes: usize,
}
