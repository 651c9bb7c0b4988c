//! Key-value persistence for cached lookups and custom products
//!
//! Everything the crate persists goes through the narrow `KeyValueStore`
//! contract: string keys mapped to string values. Two backends are provided,
//! a file-per-key store under the XDG data directory and an in-memory store.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read or write failed
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// No data directory could be determined for the current user
    #[error("Could not determine a data directory")]
    NoDataDir,
}

/// Async string key to string value store
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Returns the value stored under `key`, or `None` if absent
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}
