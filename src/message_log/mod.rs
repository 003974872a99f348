//! Ordered per-session message logs.

mod log;
mod models;

pub use self::log::MessageLog;
pub use self::models::{ChatMessage, MessageSender};
