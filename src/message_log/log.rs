//! Per-session ordered message log.

use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

use crate::persistence::{Persistence, messages_key};

use super::models::ChatMessage;

/// Capacity of the per-session subscriber channel.
const SUBSCRIBER_BUFFER_SIZE: usize = 256;

/// Append-only per-session message sequence, merging locally composed
/// and server-delivered messages in insertion order.
///
/// Every append is persisted write-through (best-effort) and fanned out
/// to subscribers in append order. The sequence observed by [`read`]
/// followed by live subscription events is exactly the total append
/// order; no message is delivered twice or out of order. Each session's
/// sequence sits behind its own async mutex, so concurrent appends
/// (the send path racing the connection reader) push, notify, and
/// persist as one serialized step.
///
/// [`read`]: MessageLog::read
pub struct MessageLog {
    persistence: Persistence,
    logs: DashMap<String, Arc<Mutex<Vec<ChatMessage>>>>,
    subscribers: DashMap<String, broadcast::Sender<ChatMessage>>,
    awaiting: DashMap<String, bool>,
    /// When set, only the newest N messages are persisted. The
    /// in-memory sequence is never truncated.
    max_persisted: Option<usize>,
}

impl MessageLog {
    /// Create a message log over the given persistence facade.
    pub fn new(persistence: Persistence, max_persisted: Option<usize>) -> Self {
        Self {
            persistence,
            logs: DashMap::new(),
            subscribers: DashMap::new(),
            awaiting: DashMap::new(),
            max_persisted,
        }
    }

    /// Append a message to a session's log: push in memory, notify
    /// subscribers, then persist the updated sequence.
    ///
    /// The session lock is held across all three steps, so two
    /// concurrent appends cannot invert subscriber order or let an
    /// older snapshot's save land after a newer one.
    pub async fn append(&self, session_id: &str, message: ChatMessage) {
        let log = self.session_log(session_id).await;
        let mut messages = log.lock().await;
        messages.push(message.clone());

        if let Some(tx) = self.subscribers.get(session_id) {
            // No receivers is fine; subscription is optional.
            let _ = tx.send(message);
        }

        let snapshot = self.persistable_slice(&messages);
        // The lock stays held through the save so snapshots reach
        // storage in append order.
        self.persistence
            .save(&messages_key(session_id), &snapshot)
            .await;
    }

    /// Read a session's full backlog in append order. Empty when
    /// nothing was ever appended or persisted.
    pub async fn read(&self, session_id: &str) -> Vec<ChatMessage> {
        let log = self.session_log(session_id).await;
        let messages = log.lock().await;
        messages.clone()
    }

    /// Subscribe to subsequent appends for a session. No replay: call
    /// [`read`](Self::read) first for the backlog.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<ChatMessage> {
        self.subscribers
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER_SIZE).0)
            .subscribe()
    }

    /// Mark the session as waiting for a server reply. The connection
    /// path clears it on the next inbound frame.
    pub fn set_awaiting(&self, session_id: &str) {
        self.awaiting.insert(session_id.to_string(), true);
    }

    /// End the awaiting-reply indicator for a session.
    pub fn clear_awaiting(&self, session_id: &str) {
        self.awaiting.insert(session_id.to_string(), false);
    }

    /// Whether the session has an outstanding awaiting-reply indicator.
    pub fn is_awaiting(&self, session_id: &str) -> bool {
        self.awaiting
            .get(session_id)
            .map(|flag| *flag)
            .unwrap_or(false)
    }

    /// The session's sequence handle, hydrated from storage on first
    /// touch.
    async fn session_log(&self, session_id: &str) -> Arc<Mutex<Vec<ChatMessage>>> {
        if let Some(entry) = self.logs.get(session_id) {
            return entry.clone();
        }
        let persisted: Vec<ChatMessage> = self
            .persistence
            .load(&messages_key(session_id))
            .await
            .unwrap_or_default();
        if !persisted.is_empty() {
            debug!(
                "Restored {} persisted messages for session {session_id}",
                persisted.len()
            );
        }
        self.logs
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(persisted)))
            .clone()
    }

    /// The slice of a sequence that goes to storage, honoring the
    /// persistence cap.
    fn persistable_slice(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        match self.max_persisted {
            Some(cap) if messages.len() > cap => messages[messages.len() - cap..].to_vec(),
            _ => messages.to_vec(),
        }
    }
}
