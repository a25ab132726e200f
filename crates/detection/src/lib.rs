//! Smirk Detection Core
//!
//! Turns a noisy, frame-by-frame amusement score into a debounced,
//! session-scoped "game over" signal:
//! - Threshold classification per frame (hit / miss)
//! - Consecutive-frame confirmation with reset on miss or lost face
//! - One-time game-over edge, sticky terminal state
//! - Per-session isolation, exactly one winning confirmation under races

pub mod config;
pub mod controller;
pub mod decision;

pub use config::DetectionConfig;
pub use controller::DetectionController;
pub use decision::{Decision, FrameObservation, GameOverReason};

use thiserror::Error;

/// Detection error types
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Session id must not be empty")]
    EmptySessionId,

    #[error("Session state invariant violated: {0}")]
    InternalState(String),
}

impl From<session_store::StoreError> for DetectionError {
    fn from(err: session_store::StoreError) -> Self {
        match err {
            session_store::StoreError::EmptySessionId => DetectionError::EmptySessionId,
        }
    }
}
