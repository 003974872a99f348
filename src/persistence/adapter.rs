//! Best-effort persistence facade over a [`Store`] backend.
//!
//! Persistence is never load-bearing for the in-memory state: a failed
//! write degrades to "state will not survive reload" and a corrupt or
//! missing entry degrades to "no persisted state". Neither condition is
//! ever propagated to callers.

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::store::Store;

/// Storage key for the session list.
pub const SESSIONS_KEY: &str = "chatSessions";

/// Storage key for the credential.
pub const TOKEN_KEY: &str = "token";

/// Prefix for per-session message log keys.
pub const MESSAGES_KEY_PREFIX: &str = "messages_";

/// Build the storage key for a session's message log.
pub fn messages_key(session_id: &str) -> String {
    format!("{MESSAGES_KEY_PREFIX}{session_id}")
}

/// Best-effort serialization layer over a store backend.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn Store>,
}

impl Persistence {
    /// Create a persistence facade over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Serialize and write a value. Failures are logged and swallowed;
    /// persistence must never throw into the caller.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not serialize state for key {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.store.put(key, &serialized).await {
            warn!("Could not save state for key {key}: {e}");
        }
    }

    /// Read and deserialize a prior value. Absent, unreadable, and
    /// corrupt entries all yield `None` so callers always have a
    /// deterministic fallback.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not load state for key {key}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding corrupt entry for key {key}: {e}");
                None
            }
        }
    }

    /// Best-effort removal of a key.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!("Could not remove key {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::memory::MemoryStore;
    use super::*;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(store);

        persistence
            .save("chatSessions", &vec!["a".to_string(), "b".to_string()])
            .await;
        let loaded: Option<Vec<String>> = persistence.load("chatSessions").await;
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn test_absent_key_loads_as_none() {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let loaded: Option<Vec<String>> = persistence.load("missing").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_loads_as_none() {
        let store = Arc::new(MemoryStore::new());
        store.put("chatSessions", "{not json").await.unwrap();

        let persistence = Persistence::new(store);
        let loaded: Option<Vec<String>> = persistence.load("chatSessions").await;
        assert!(loaded.is_none());
    }

    #[test]
    fn test_messages_key() {
        assert_eq!(messages_key("session_abc"), "messages_session_abc");
    }
}
