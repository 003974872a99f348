//! Session and real-time connection core for a chat client.
//!
//! Owns chat session identity, supervises one streaming connection per
//! session, merges locally composed and server-delivered messages into
//! a single ordered log, and persists that state across reloads. The
//! UI layer is an external collaborator that calls in through
//! [`ChatClient`]; rendering, routing, and auth screens live there,
//! not here.
//!
//! Components, leaf to root:
//! - [`persistence`]: best-effort key-value persistence behind an
//!   injected [`Store`] port.
//! - [`session`]: the session catalog, hydrated from storage and
//!   write-through on every mutation.
//! - [`connection`]: the per-session channel state machine over a
//!   WebSocket transport; at most one live channel per process.
//! - [`message_log`]: append-only per-session message sequences with
//!   subscriber fan-out.
//! - [`auth`]: the credential gate consulted by every gated operation.

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod message_log;
pub mod persistence;
pub mod session;

pub use auth::AuthGate;
pub use client::ChatClient;
pub use self::config::ClientConfig;
pub use connection::{ConnectionManager, ConnectionState, RetryConfig, RetryPolicy};
pub use error::{ChatError, ChatResult};
pub use message_log::{ChatMessage, MessageLog, MessageSender};
pub use persistence::{FileStore, MemoryStore, Persistence, Store, StoreError};
pub use session::{Session, SessionRegistry};
