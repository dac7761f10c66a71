//! Session-scoped key/value store.
//!
//! Values live only as long as the [`SessionStore`] handle (one per CLI run),
//! mirroring a browser tab's session storage:
//! - LRU eviction once `max_entries` is reached
//! - Optional TTL for entries nobody has read in a while
//! - A byte quota across keys and values; writes past it are rejected
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_session::{SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default().with_max_entries(16));
//! store.set("kb", "{...}").await?;
//! assert!(store.get("kb").await.is_some());
//! ```

mod config;
mod error;
mod store;
mod ttl;

pub use config::StoreConfig;
pub use error::{Result, SessionError};
pub use store::{SessionStore, StoreStats};
pub use ttl::TtlTracker;
