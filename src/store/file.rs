//! File-backed key-value store
//!
//! Stores each value in its own file named after the (encoded) key, inside an
//! XDG-compliant data directory (`~/.local/share/foodlens/` on Linux).

use async_trait::async_trait;
use directories::ProjectDirs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use super::{KeyValueStore, StoreError};

/// Persists values as one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore in the XDG data directory for foodlens
    pub fn new() -> Result<Self, StoreError> {
        let project_dirs = ProjectDirs::from("", "", "foodlens").ok_or(StoreError::NoDataDir)?;
        Ok(Self {
            dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the directory values are stored in
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Returns the path of the file holding `key`
    fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.item_path(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.item_path(key), value).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.item_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Encodes a key into a file-name-safe string
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. The encoding is injective, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
