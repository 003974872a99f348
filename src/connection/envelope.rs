//! Inbound wire frame parsing.
//!
//! The contract is "never silently discard an inbound frame": anything
//! that does not parse as a message envelope is wrapped as a remote
//! message carrying the raw frame text.

use log::warn;
use serde::Deserialize;

use crate::message_log::{ChatMessage, MessageSender};

/// Inbound envelope as the server frames it. `id` may be a number, a
/// string, or absent; only `content` is required.
#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(default)]
    id: Option<serde_json::Value>,
    content: String,
    #[serde(default)]
    sender: Option<MessageSender>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Parse one received text frame into a message.
///
/// A frame that is not a valid JSON envelope is surfaced as
/// `{content: raw, sender: remote, timestamp: now}` rather than
/// dropped, so malformed server output still reaches the log.
pub fn parse_frame(raw: &str) -> ChatMessage {
    match serde_json::from_str::<InboundEnvelope>(raw) {
        Ok(envelope) => ChatMessage {
            id: envelope.id.as_ref().and_then(|v| v.as_u64()),
            content: envelope.content,
            sender: envelope.sender.unwrap_or(MessageSender::Remote),
            timestamp: envelope
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        },
        Err(e) => {
            warn!("Received non-envelope frame ({e}); wrapping raw text");
            ChatMessage::remote(raw)
        }
    }
}
