//! Live channel management: one streaming connection per session.

mod envelope;
mod manager;
mod retry;
mod state;

pub use envelope::parse_frame;
pub use manager::ConnectionManager;
pub use retry::{RetryConfig, RetryPolicy};
pub use state::ConnectionState;
