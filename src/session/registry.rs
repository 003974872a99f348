//! Session registry - catalog of chat sessions and the current selection.

use log::{debug, info};
use std::sync::{Arc, RwLock};

use crate::auth::AuthGate;
use crate::error::{ChatError, ChatResult};
use crate::persistence::{Persistence, SESSIONS_KEY, messages_key};

use super::models::Session;

/// In-memory catalog of sessions, hydrated from storage at construction
/// and write-through on every mutation so a reload reconstructs the
/// list exactly.
///
/// The list is ordered most-recently-created first. Creation is gated
/// on the injected [`AuthGate`].
pub struct SessionRegistry {
    persistence: Persistence,
    auth: Arc<AuthGate>,
    sessions: RwLock<Vec<Session>>,
    current: RwLock<Option<String>>,
}

impl SessionRegistry {
    /// Create a registry, restoring the persisted session list.
    pub async fn load(persistence: Persistence, auth: Arc<AuthGate>) -> Self {
        let sessions: Vec<Session> = persistence.load(SESSIONS_KEY).await.unwrap_or_default();
        if !sessions.is_empty() {
            debug!("Restored {} persisted sessions", sessions.len());
        }
        Self {
            persistence,
            auth,
            sessions: RwLock::new(sessions),
            current: RwLock::new(None),
        }
    }

    /// List all sessions, most-recently-created first.
    pub fn list(&self) -> Vec<Session> {
        self.sessions.read().expect("registry lock poisoned").clone()
    }

    /// Get a session by id.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .expect("registry lock poisoned")
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// The currently selected session, if any.
    pub fn current(&self) -> Option<Session> {
        let current = self.current.read().expect("registry lock poisoned");
        current.as_deref().and_then(|id| self.get(id))
    }

    /// Create a new session and select it.
    ///
    /// Fails with [`ChatError::NotAuthenticated`] before touching the
    /// registry or storage, so a rejected call leaves no partial state.
    /// On success the new session is prepended, the list and an empty
    /// message log for it are persisted, and it becomes current.
    pub async fn create(&self) -> ChatResult<Session> {
        if !self.auth.has_credential() {
            return Err(ChatError::NotAuthenticated);
        }

        let session = {
            let mut sessions = self.sessions.write().expect("registry lock poisoned");
            let session = Session::new(sessions.len() + 1);
            sessions.insert(0, session.clone());
            session
        };

        self.persist_list().await;
        self.persistence
            .save(&messages_key(&session.id), &Vec::<serde_json::Value>::new())
            .await;
        self.set_current(&session.id);

        info!("Created session {}", session.id);
        Ok(session)
    }

    /// Resume a session whose id arrived from outside the client, e.g.
    /// a shared link. A known id is simply selected; an unknown id gets
    /// a synthesized record. Calling twice with the same id never
    /// duplicates the entry.
    pub async fn resume_external(&self, id: &str) -> Session {
        if let Some(existing) = self.get(id) {
            self.set_current(id);
            return existing;
        }

        let session = {
            let mut sessions = self.sessions.write().expect("registry lock poisoned");
            let session = Session::with_id(id, sessions.len() + 1);
            sessions.push(session.clone());
            session
        };

        self.persist_list().await;
        self.set_current(id);

        info!("Resumed external session {id}");
        session
    }

    /// Select an existing session as current.
    pub fn select(&self, id: &str) -> ChatResult<Session> {
        let session = self
            .get(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        self.set_current(id);
        Ok(session)
    }

    fn set_current(&self, id: &str) {
        *self.current.write().expect("registry lock poisoned") = Some(id.to_string());
    }

    async fn persist_list(&self) {
        let snapshot = self.list();
        self.persistence.save(SESSIONS_KEY, &snapshot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    async fn registry_with_credential() -> SessionRegistry {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        auth.set_credential("tok").await;
        SessionRegistry::load(persistence, auth).await
    }

    #[tokio::test]
    async fn test_create_names_and_orders_sessions() {
        let registry = registry_with_credential().await;

        let first = registry.create().await.unwrap();
        assert_eq!(first.display_name, "Chat 1");
        assert_eq!(registry.list().len(), 1);

        let second = registry.create().await.unwrap();
        assert_eq!(second.display_name, "Chat 2");

        // Newest first.
        let listed = registry.list();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(registry.current().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_create_without_credential_leaves_no_state() {
        let store = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(store.clone());
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        let registry = SessionRegistry::load(persistence, auth).await;

        let err = registry.create().await.unwrap_err();
        assert!(matches!(err, ChatError::NotAuthenticated));
        assert!(registry.list().is_empty());
        assert!(registry.current().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_resume_external_is_idempotent() {
        let registry = registry_with_credential().await;

        let first = registry.resume_external("session_shared").await;
        let second = registry.resume_external("session_shared").await;

        assert_eq!(first.id, second.id);
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.current().unwrap().id, "session_shared");
    }

    #[tokio::test]
    async fn test_select_unknown_session() {
        let registry = registry_with_credential().await;
        let err = registry.select("session_missing").unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let persistence = Persistence::new(store.clone());
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        auth.set_credential("tok").await;

        let registry = SessionRegistry::load(persistence, auth.clone()).await;
        registry.create().await.unwrap();
        registry.create().await.unwrap();
        let before = registry.list();

        let reloaded = SessionRegistry::load(Persistence::new(store), auth).await;
        assert_eq!(reloaded.list(), before);
    }
}
