//! Key-value store trait definition.

use async_trait::async_trait;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur inside a store backend.
///
/// These never cross the [`Persistence`](super::Persistence) facade;
/// callers above it only ever observe "value present" or "value absent".
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid storage key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Storage backend error.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable key-value store for serialized client state.
///
/// Implementations provide the storage substrate: a directory of files
/// in production, an in-memory map in tests. Values are opaque strings;
/// serialization happens above this trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value for a key. `Ok(None)` when the key has never been
    /// written or was removed.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write the value for a key, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidKey("a/b".to_string());
        assert_eq!(err.to_string(), "invalid key: a/b");
    }
}
