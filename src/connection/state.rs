//! Channel state machine.

use serde::Serialize;

/// Lifecycle state of a session's channel.
///
/// Transitions:
/// `Idle --open--> Connecting --accept--> Open --close--> Closed`,
/// with any state moving to `Errored` on a transport failure.
/// `Closed` and `Errored` are terminal for a channel instance;
/// retrying or switching sessions creates a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No channel has been opened for this session.
    Idle,
    /// Transport handshake in progress.
    Connecting,
    /// Channel established; sends and receives flow.
    Open,
    /// Close initiated, teardown in progress.
    Closing,
    /// Channel ended cleanly.
    Closed,
    /// Channel ended on a transport failure. Not retried automatically.
    Errored,
}

impl ConnectionState {
    /// Whether this channel instance can never carry traffic again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }

    /// Whether the channel is live or becoming live.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Errored => write!(f, "errored"),
        }
    }
}
