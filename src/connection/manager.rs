//! Connection manager - owns the live channel and its lifecycle.

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::auth::AuthGate;
use crate::error::{ChatError, ChatResult};
use crate::message_log::{ChatMessage, MessageLog};

use super::envelope::parse_frame;
use super::retry::RetryPolicy;
use super::state::ConnectionState;

/// Size of the outbound frame queue.
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Owns at most one live channel process-wide and tracks per-session
/// connection state.
///
/// Opening a channel for one session closes any channel held by a
/// different session first; sessions are never multiplexed over one
/// connection. `Closed` and `Errored` channels are not resurrected --
/// re-opening creates a fresh channel instance.
pub struct ConnectionManager {
    server_url: String,
    auth: Arc<AuthGate>,
    log: Arc<MessageLog>,
    retry: RetryPolicy,
    states: Arc<DashMap<String, ConnectionState>>,
    active: Mutex<Option<ActiveChannel>>,
}

/// Handle to the live channel's tasks.
struct ActiveChannel {
    session_id: String,
    outbound_tx: mpsc::Sender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ConnectionManager {
    /// Create a manager that connects to the given server base URL
    /// (e.g. `ws://chat.example.com`).
    pub fn new(
        server_url: impl Into<String>,
        auth: Arc<AuthGate>,
        log: Arc<MessageLog>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            auth,
            log,
            retry,
            states: Arc::new(DashMap::new()),
            active: Mutex::new(None),
        }
    }

    /// Current connection state for a session. `Idle` for sessions that
    /// never had a channel.
    pub fn state(&self, session_id: &str) -> ConnectionState {
        self.states
            .get(session_id)
            .map(|s| *s)
            .unwrap_or(ConnectionState::Idle)
    }

    /// Open a channel for a session.
    ///
    /// Any channel held by a different session is closed first, so its
    /// state is `Closed` before this session leaves `Idle`. A channel
    /// that is already live for this session is left alone. Nothing
    /// composed before the channel existed is flushed automatically.
    pub async fn open(&self, session_id: &str) -> ChatResult<()> {
        let mut active = self.active.lock().await;

        if let Some(channel) = active.as_ref() {
            if channel.session_id == session_id && self.state(session_id).is_active() {
                debug!("Channel for session {session_id} already live");
                return Ok(());
            }
        }
        if let Some(previous) = active.take() {
            self.teardown(previous).await;
        }

        self.states
            .insert(session_id.to_string(), ConnectionState::Connecting);
        let url = self.channel_url(session_id);
        debug!("Connecting channel for session {session_id}");

        let mut attempt = 0u32;
        let stream = loop {
            match connect_async(url.as_str()).await {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    attempt += 1;
                    match self.retry.delay(attempt) {
                        Some(delay) => {
                            warn!(
                                "Connect attempt {attempt} for session {session_id} failed ({e}); retrying in {delay:?}"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!("Connect failed for session {session_id}: {e}");
                            self.states
                                .insert(session_id.to_string(), ConnectionState::Errored);
                            return Err(ChatError::Transport(e.to_string()));
                        }
                    }
                }
            }
        };

        self.states
            .insert(session_id.to_string(), ConnectionState::Open);
        info!("Channel open for session {session_id}");

        let (mut ws_tx, mut ws_rx) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER_SIZE);

        let writer = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    warn!("Failed to write frame: {e}");
                    return;
                }
            }
            // Queue dropped: announce the close to the server.
            let _ = ws_tx.send(Message::Close(None)).await;
        });

        let states = self.states.clone();
        let message_log = self.log.clone();
        let sid = session_id.to_string();
        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_rx.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let message = parse_frame(text.as_str());
                        message_log.append(&sid, message).await;
                        message_log.clear_awaiting(&sid);
                    }
                    Ok(Message::Binary(data)) => {
                        let text = String::from_utf8_lossy(&data);
                        let message = parse_frame(&text);
                        message_log.append(&sid, message).await;
                        message_log.clear_awaiting(&sid);
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Server closed channel for session {sid}");
                        states.insert(sid.clone(), ConnectionState::Closed);
                        return;
                    }
                    // Ping/pong is handled by the transport.
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Transport error on session {sid}: {e}");
                        states.insert(sid.clone(), ConnectionState::Errored);
                        return;
                    }
                }
            }
            states.insert(sid.clone(), ConnectionState::Closed);
        });

        *active = Some(ActiveChannel {
            session_id: session_id.to_string(),
            outbound_tx,
            reader,
            writer,
        });
        Ok(())
    }

    /// Transmit a message over the session's channel.
    ///
    /// Fails with [`ChatError::NotConnected`] unless that session's
    /// channel is `Open`. The payload is the message envelope
    /// serialized into a text frame.
    pub async fn send(&self, session_id: &str, message: &ChatMessage) -> ChatResult<()> {
        let active = self.active.lock().await;
        let channel = active
            .as_ref()
            .filter(|c| c.session_id == session_id)
            .ok_or_else(|| ChatError::NotConnected(session_id.to_string()))?;

        if self.state(session_id) != ConnectionState::Open {
            return Err(ChatError::NotConnected(session_id.to_string()));
        }

        let text =
            serde_json::to_string(message).map_err(|e| ChatError::Transport(e.to_string()))?;
        channel
            .outbound_tx
            .send(text)
            .await
            .map_err(|_| ChatError::NotConnected(session_id.to_string()))
    }

    /// Close the session's channel. Idempotent: unknown ids and
    /// already-terminal channels are a no-op.
    pub async fn close(&self, session_id: &str) {
        let mut active = self.active.lock().await;
        if active
            .as_ref()
            .is_some_and(|c| c.session_id == session_id)
        {
            if let Some(channel) = active.take() {
                self.teardown(channel).await;
            }
        }
    }

    /// Tear down a channel instance: `Open|Connecting -> Closed`
    /// through `Closing`; terminal channels just have their tasks
    /// reaped.
    async fn teardown(&self, channel: ActiveChannel) {
        let session_id = channel.session_id;
        let was_active = self.state(&session_id).is_active();
        if was_active {
            self.states
                .insert(session_id.clone(), ConnectionState::Closing);
        }

        channel.reader.abort();
        // Wait for the reader to actually stop; a reader past its
        // last await could otherwise record a state after the close
        // is final.
        let _ = channel.reader.await;

        if was_active {
            // Dropping the queue lets the writer drain and send a
            // close frame on its own.
            drop(channel.outbound_tx);
            self.states
                .insert(session_id.clone(), ConnectionState::Closed);
            info!("Closed channel for session {session_id}");
        } else {
            channel.writer.abort();
        }
    }

    /// Build the channel URL for a session, attaching the credential
    /// when one is present.
    fn channel_url(&self, session_id: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        let mut url = format!("{base}/api/chat?session_id={session_id}");
        if let Some(token) = self.auth.credential() {
            url.push_str("&token=");
            url.push_str(&urlencoding::encode(&token));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, Persistence};

    async fn manager(server_url: &str, retry: RetryPolicy) -> ConnectionManager {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        let log = Arc::new(MessageLog::new(persistence, None));
        ConnectionManager::new(server_url, auth, log, retry)
    }

    #[tokio::test]
    async fn test_state_defaults_to_idle() {
        let manager = manager("ws://127.0.0.1:9", RetryPolicy::None).await;
        assert_eq!(manager.state("session_a"), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_send_without_channel_is_not_connected() {
        let manager = manager("ws://127.0.0.1:9", RetryPolicy::None).await;
        let err = manager
            .send("session_a", &ChatMessage::user(1, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_failed_connect_marks_errored() {
        // Nothing listens on the discard port; connect is refused.
        let manager = manager("ws://127.0.0.1:9", RetryPolicy::None).await;
        let err = manager.open("session_a").await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
        assert_eq!(manager.state("session_a"), ConnectionState::Errored);
    }

    #[tokio::test]
    async fn test_close_unknown_session_is_noop() {
        let manager = manager("ws://127.0.0.1:9", RetryPolicy::None).await;
        manager.close("session_a").await;
        manager.close("session_a").await;
        assert_eq!(manager.state("session_a"), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_channel_url_attaches_credential() {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let auth = Arc::new(AuthGate::load(persistence.clone()).await);
        let log = Arc::new(MessageLog::new(persistence, None));
        let manager =
            ConnectionManager::new("ws://chat.example.com/", auth.clone(), log, RetryPolicy::None);

        assert_eq!(
            manager.channel_url("session_a"),
            "ws://chat.example.com/api/chat?session_id=session_a"
        );

        auth.set_credential("a token").await;
        assert_eq!(
            manager.channel_url("session_a"),
            "ws://chat.example.com/api/chat?session_id=session_a&token=a%20token"
        );
    }
}
