//! Configuration for the session store.

use std::time::Duration;

/// Default maximum number of entries before LRU eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 64;

/// Default byte quota. Browsers give session storage about 5 MiB per origin.
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of entries kept before the least recently used is evicted.
    pub max_entries: usize,

    /// Quota over the summed byte length of all keys and values.
    pub max_bytes: usize,

    /// Optional time-to-live measured from an entry's last access.
    pub ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
            ttl: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the byte quota.
    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = max;
        self
    }

    /// Set the TTL for entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Disable TTL (entries live until evicted or removed).
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }
}
