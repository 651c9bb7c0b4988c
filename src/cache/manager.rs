//! Cache manager for memoizing provider responses
//!
//! Provides a `CacheManager` that stores serializable data as timestamped JSON
//! strings in a `KeyValueStore`. Entries older than the TTL are dropped the
//! next time they are read; nothing sweeps the store in the background.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::store::KeyValueStore;

/// Default time-to-live for cache entries: 7 days in milliseconds
pub const DEFAULT_TTL_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Wrapper struct for cached data as it is stored
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// When the data was cached (epoch milliseconds)
    timestamp: i64,
    /// The cached data
    payload: T,
}

/// Reads and writes TTL-bounded entries in a key-value store
///
/// Cache failures never reach the caller: a store or serialization error is
/// logged and the read is treated as a miss, the write as a no-op.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
}

impl CacheManager {
    /// Creates a CacheManager over `store` with the default 7-day TTL
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ttl_millis: DEFAULT_TTL_MILLIS,
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the TTL
    pub fn with_ttl(mut self, ttl_millis: i64) -> Self {
        self.ttl_millis = ttl_millis;
        self
    }

    /// Reads a cached payload
    ///
    /// # Returns
    /// * `Some(T)` if the entry exists, parses, and is no older than the TTL
    /// * `None` if the entry is missing, unreadable, or expired. Expired
    ///   entries are removed from the store.
    pub async fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let content = match self.store.get_item(key).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "cache entry could not be parsed");
                return None;
            }
        };

        let age = self.clock.now_millis() - entry.timestamp;
        if age > self.ttl_millis {
            debug!(key, age_ms = age, "cache entry expired");
            if let Err(e) = self.store.remove_item(key).await {
                warn!(key, error = %e, "failed to remove expired cache entry");
            }
            return None;
        }

        debug!(key, "cache hit");
        Some(entry.payload)
    }

    /// Writes `payload` under `key` stamped with the current time,
    /// replacing any previous entry
    pub async fn set_cached<T: Serialize>(&self, key: &str, payload: &T) {
        let entry = CacheEntry {
            timestamp: self.clock.now_millis(),
            payload,
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "cache entry could not be serialized");
                return;
            }
        };

        if let Err(e) = self.store.set_item(key, &json).await {
            warn!(key, error = %e, "cache write failed");
        }
    }
}
