//! Durable key-value persistence for client state.
//!
//! The [`Store`] trait is the injected port; [`FileStore`] backs it with
//! a directory of JSON files and [`MemoryStore`] with an in-memory map.
//! All state above this module goes through the [`Persistence`] facade,
//! which makes every write best-effort and every read fall back to
//! "absent" on corruption.

mod adapter;
mod file;
mod memory;
mod store;

pub use adapter::{MESSAGES_KEY_PREFIX, Persistence, SESSIONS_KEY, TOKEN_KEY, messages_key};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{Store, StoreError, StoreResult};
