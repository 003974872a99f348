//! Chat client facade - the API consumed by the UI layer.

use dashmap::DashMap;
use log::warn;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::AuthGate;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{ChatError, ChatResult};
use crate::message_log::{ChatMessage, MessageLog};
use crate::persistence::{FileStore, Persistence, Store};
use crate::session::{Session, SessionRegistry};

/// Facade over the session registry, message log, connection manager,
/// and auth gate. One instance per process; the UI layer calls into it
/// and renders what it reads back.
///
/// Transport failures while switching sessions are recorded on the
/// session's connection state (visible through
/// [`connection_state`](Self::connection_state)) rather than failing
/// the switch; re-selecting the session retries the channel.
pub struct ChatClient {
    config: ClientConfig,
    auth: Arc<AuthGate>,
    registry: SessionRegistry,
    log: Arc<MessageLog>,
    connections: ConnectionManager,
    /// Last locally assigned message id per session.
    local_ids: DashMap<String, u64>,
}

impl ChatClient {
    /// Create a client over the file-backed store in
    /// `config.data_dir`.
    pub async fn new(config: ClientConfig) -> Self {
        let store = Arc::new(FileStore::new(&config.data_dir));
        Self::with_store(config, store).await
    }

    /// Create a client over an injected store (tests use the in-memory
    /// one).
    pub async fn with_store(config: ClientConfig, store: Arc<dyn Store>) -> Self {
        let persistence = Persistence::new(store);
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        let registry = SessionRegistry::load(persistence.clone(), auth.clone()).await;
        let log = Arc::new(MessageLog::new(
            persistence,
            config.max_persisted_messages,
        ));
        let connections = ConnectionManager::new(
            config.server_url.clone(),
            auth.clone(),
            log.clone(),
            config.retry.clone().into(),
        );
        Self {
            config,
            auth,
            registry,
            log,
            connections,
            local_ids: DashMap::new(),
        }
    }

    // ========== Authentication ==========

    /// Store the credential for gated operations.
    pub async fn login(&self, token: impl Into<String>) {
        self.auth.set_credential(token).await;
    }

    /// Clear the credential and close the live channel, if any.
    pub async fn logout(&self) {
        if let Some(current) = self.registry.current() {
            self.connections.close(&current.id).await;
        }
        self.auth.clear_credential().await;
    }

    /// Whether a credential is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.auth.has_credential()
    }

    // ========== Sessions ==========

    /// Create a new session, select it, and open its channel.
    pub async fn create_session(&self) -> ChatResult<Session> {
        let session = self.registry.create().await?;
        self.switch_channel(&session.id).await;
        Ok(session)
    }

    /// Select an existing session and switch the live channel to it.
    pub async fn select_session(&self, id: &str) -> ChatResult<Session> {
        let session = self.registry.select(id)?;
        self.switch_channel(id).await;
        Ok(session)
    }

    /// Resume a session whose id arrived from outside the client (a
    /// shared link's query parameter). Idempotent per id.
    pub async fn resume_from_link(&self, id: &str) -> Session {
        let session = self.registry.resume_external(id).await;
        self.switch_channel(id).await;
        session
    }

    /// All sessions, most-recently-created first.
    pub fn sessions(&self) -> Vec<Session> {
        self.registry.list()
    }

    /// The currently selected session.
    pub fn current_session(&self) -> Option<Session> {
        self.registry.current()
    }

    // ========== Messages ==========

    /// Compose and send a message on a session.
    ///
    /// The message is appended to the log (and persisted) before
    /// transmission, so a failed send leaves it in the log as
    /// composed-but-unsent; resending is the caller's action. Fails
    /// with [`ChatError::NotConnected`] when the session's channel is
    /// not open.
    pub async fn send_message(&self, session_id: &str, text: impl Into<String>) -> ChatResult<ChatMessage> {
        if !self.auth.has_credential() {
            return Err(ChatError::NotAuthenticated);
        }
        if self.registry.get(session_id).is_none() {
            return Err(ChatError::NotFound(session_id.to_string()));
        }

        let message = ChatMessage::user(self.next_local_id(session_id), text);
        self.log.append(session_id, message.clone()).await;

        self.connections.send(session_id, &message).await?;
        self.log.set_awaiting(session_id);
        Ok(message)
    }

    /// A session's full message backlog in append order.
    pub async fn get_log(&self, session_id: &str) -> Vec<ChatMessage> {
        self.log.read(session_id).await
    }

    /// Subscribe to subsequent appends for a session. No replay; read
    /// the backlog first.
    pub fn on_message(&self, session_id: &str) -> broadcast::Receiver<ChatMessage> {
        self.log.subscribe(session_id)
    }

    /// Whether the session has sent a message and not yet received a
    /// reply (the UI's "thinking" indicator).
    pub fn is_awaiting_response(&self, session_id: &str) -> bool {
        self.log.is_awaiting(session_id)
    }

    // ========== Connection ==========

    /// Connection state for a session's channel.
    pub fn connection_state(&self, session_id: &str) -> ConnectionState {
        self.connections.state(session_id)
    }

    /// Re-open the channel for a session, e.g. after an error. The
    /// explicit caller-driven retry path.
    pub async fn reconnect(&self, session_id: &str) -> ChatResult<()> {
        if self.registry.get(session_id).is_none() {
            return Err(ChatError::NotFound(session_id.to_string()));
        }
        self.connections.open(session_id).await
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the channel for a newly selected session. Connect failures
    /// are recorded on the connection state, not propagated: selection
    /// itself has already taken effect.
    async fn switch_channel(&self, session_id: &str) {
        if let Err(e) = self.connections.open(session_id).await {
            warn!("Channel for session {session_id} unavailable: {e}");
        }
    }

    /// Next locally unique, monotonic message id for a session.
    /// Millisecond timestamps, bumped past the previous id when the
    /// clock does not advance.
    fn next_local_id(&self, session_id: &str) -> u64 {
        let now = chrono::Utc::now().timestamp_millis() as u64;
        let mut last = self.local_ids.entry(session_id.to_string()).or_insert(0);
        let next = now.max(*last + 1);
        *last = next;
        next
    }
}
