//! Credential gate for authenticated operations.
//!
//! The gate holds the process-wide bearer token and reports its
//! presence; it never redirects or renders. Operations that require
//! authentication consult [`AuthGate::has_credential`] and fail with
//! [`ChatError::NotAuthenticated`](crate::ChatError::NotAuthenticated)
//! instead of proceeding.

use log::{debug, info};
use std::sync::RwLock;

use crate::persistence::{Persistence, TOKEN_KEY};

/// Holds the bearer token and persists it across reloads.
///
/// An explicit, injected object: every component that needs gating
/// receives a handle rather than reading ambient global state.
pub struct AuthGate {
    persistence: Persistence,
    token: RwLock<Option<String>>,
}

impl AuthGate {
    /// Create a gate, restoring any persisted credential.
    pub async fn load(persistence: Persistence) -> Self {
        let token: Option<String> = persistence.load(TOKEN_KEY).await;
        if token.is_some() {
            debug!("Restored persisted credential");
        }
        Self {
            persistence,
            token: RwLock::new(token),
        }
    }

    /// Store a credential and persist it (write-through).
    pub async fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        self.persistence.save(TOKEN_KEY, &token).await;
        *self.token.write().expect("auth lock poisoned") = Some(token);
        info!("Credential set");
    }

    /// Clear the credential, in memory and in storage. Used on logout
    /// and on server rejection.
    pub async fn clear_credential(&self) {
        *self.token.write().expect("auth lock poisoned") = None;
        self.persistence.remove(TOKEN_KEY).await;
        info!("Credential cleared");
    }

    /// Check whether a credential is present.
    pub fn has_credential(&self) -> bool {
        self.token.read().expect("auth lock poisoned").is_some()
    }

    /// Get a copy of the credential, for attaching to connection URLs.
    pub fn credential(&self) -> Option<String> {
        self.token.read().expect("auth lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_clear() {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let gate = AuthGate::load(persistence).await;

        assert!(!gate.has_credential());
        assert!(gate.credential().is_none());

        gate.set_credential("bearer-xyz").await;
        assert!(gate.has_credential());
        assert_eq!(gate.credential().as_deref(), Some("bearer-xyz"));

        gate.clear_credential().await;
        assert!(!gate.has_credential());
    }

    #[tokio::test]
    async fn test_credential_survives_reload() {
        let store = Arc::new(MemoryStore::new());

        let gate = AuthGate::load(Persistence::new(store.clone())).await;
        gate.set_credential("bearer-xyz").await;

        // Fresh gate over the same store sees the persisted token.
        let reloaded = AuthGate::load(Persistence::new(store)).await;
        assert_eq!(reloaded.credential().as_deref(), Some("bearer-xyz"));
    }
}
