//! Evaluation inputs and outcomes

use serde::{Deserialize, Serialize};

/// One scored frame, as seen by the controller.
///
/// The score comes from the external frame scorer; `frame_seq` is an
/// advisory ordering hint and never a correctness gate.
#[derive(Debug, Clone, Copy)]
pub struct FrameObservation {
    /// Amusement/happiness confidence in [0, 1]
    pub score: f32,

    /// Whether the scorer found a face; when false the score is ignored
    pub face_found: bool,

    /// Client-side frame counter, monotonically intended
    pub frame_seq: Option<u64>,

    /// Client-supplied frame timestamp (ms since epoch)
    pub timestamp_ms: f64,
}

/// Why the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    ConsecutiveFrames,
}

/// Outcome of evaluating one frame against a session's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether this frame individually crossed the threshold
    pub is_smirk: bool,

    /// Current consecutive hit streak after this frame
    pub consecutive_hit_count: u32,

    /// Sticky: true on the confirming frame and every frame after
    pub game_over: bool,

    /// Present only on the exact frame that first confirmed game-over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GameOverReason>,

    /// Timestamp of the confirming frame, once confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at_ms: Option<f64>,

    /// Whether the incoming score had to be clamped into [0, 1]
    pub score_clamped: bool,
}
