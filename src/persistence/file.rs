//! File-backed store implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::store::{Store, StoreError, StoreResult};

/// File-backed key-value store: one file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Base directory for stored entries.
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory. The
    /// directory is created lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a key to its file path, rejecting keys that would escape
    /// the base directory.
    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }

    /// Ensure the base directory exists.
    async fn ensure_base_dir(&self) -> StoreResult<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        self.ensure_base_dir().await?;
        // Write to a temp file and rename so a crash mid-write leaves
        // the previous snapshot intact instead of a truncated entry.
        let staging = self.base_path.join(format!("{key}.json.tmp"));
        fs::write(&staging, value).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
