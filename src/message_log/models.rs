//! Message data models.

use serde::{Deserialize, Serialize};

/// Who originated a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    /// Locally composed by the user.
    User,
    /// Delivered by the server. Older servers label this `"ai"`.
    #[serde(alias = "ai")]
    Remote,
}

impl std::fmt::Display for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageSender::User => write!(f, "user"),
            MessageSender::Remote => write!(f, "remote"),
        }
    }
}

/// One chat message. Doubles as the wire envelope: the outbound frame
/// is this struct serialized as JSON.
///
/// Immutable once appended to a log. Within a log, messages are ordered
/// by insertion, never by `timestamp` -- insertion order is the only
/// ordering the client can guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Locally unique id, monotonic for local origin. Absent on most
    /// inbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Message text.
    pub content: String,
    /// Originator.
    pub sender: MessageSender,
    /// RFC 3339 timestamp. Metadata only; carries no ordering weight.
    pub timestamp: String,
}

impl ChatMessage {
    /// Build a locally composed message.
    pub fn user(id: u64, content: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            content: content.into(),
            sender: MessageSender::User,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Build a server-delivered message stamped with the current time.
    pub fn remote(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            sender: MessageSender::Remote,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
