//! Error types surfaced to callers of the chat core.

use thiserror::Error;

/// Result type for chat core operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur during chat core operations.
///
/// Every variant is recoverable and local to one session's operation;
/// nothing here is fatal to the process. Persistence failures never
/// appear in this taxonomy -- they are swallowed at the persistence
/// boundary and degrade to "no persisted state".
#[derive(Debug, Error)]
pub enum ChatError {
    /// A gated action was attempted without a credential.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Unknown session id.
    #[error("unknown session: {0}")]
    NotFound(String),

    /// A send was attempted while the session's channel was not open.
    #[error("channel not open for session: {0}")]
    NotConnected(String),

    /// Channel-level transport failure. The session's connection state
    /// has already been marked errored; retry is caller-driven.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChatError {
    /// Check whether retrying the operation could succeed without
    /// any caller action other than reconnecting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::NotConnected(_) | ChatError::Transport(_))
    }
}
