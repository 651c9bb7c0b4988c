//! Cache module for memoizing provider responses
//!
//! This module provides a cache manager that stores lookups in the key-value
//! store with a fixed TTL (7 days by default). Expiry is lazy: stale entries
//! are removed when a read finds them, and cache failures are never surfaced
//! to callers.

mod manager;

pub use manager::{CacheManager, DEFAULT_TTL_MILLIS};
