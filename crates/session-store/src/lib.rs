//! Session Store
//!
//! In-memory mapping from session id to per-session smirk-detection state.
//! Sessions are created lazily, reset explicitly, and never expire on their
//! own; each record sits behind its own lock so frames for different sessions
//! proceed in parallel while same-session updates are serialized.

mod record;
mod store;

pub use record::{SessionRecord, SessionSnapshot};
pub use store::SessionStore;

use thiserror::Error;

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session id must not be empty")]
    EmptySessionId,
}
