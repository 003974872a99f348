//! Session identity and catalog.

mod models;
mod registry;

pub use models::{Session, generate_session_id};
pub use registry::SessionRegistry;
