//! Session data models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for generated session ids.
const SESSION_ID_PREFIX: &str = "session_";

/// A logical chat conversation, with its own message log and channel.
///
/// Immutable after creation; the registry never rewrites a session
/// record, only the list membership and order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, server-correlatable session id.
    pub id: String,
    /// Human-readable name, derived from ordinal position ("Chat 3").
    #[serde(rename = "name")]
    pub display_name: String,
    /// Creation time as an RFC 3339 string.
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl Session {
    /// Build a session with a fresh random id. `ordinal` is the
    /// one-based position used for the display name.
    pub fn new(ordinal: usize) -> Self {
        Self::with_id(generate_session_id(), ordinal)
    }

    /// Build a session record for a known id (e.g., one arriving from a
    /// shared link).
    pub fn with_id(id: impl Into<String>, ordinal: usize) -> Self {
        Self {
            id: id.into(),
            display_name: format!("Chat {ordinal}"),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Generate a fresh session id from a random source. Random rather
/// than a counter so concurrent clients cannot collide.
pub fn generate_session_id() -> String {
    format!("{}{}", SESSION_ID_PREFIX, Uuid::new_v4().simple())
}
