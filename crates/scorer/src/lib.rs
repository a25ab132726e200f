//! Frame Scorer
//!
//! Capability boundary between the detection core and the ML world:
//! - Decoding webcam frames (raw bytes, base64, data URIs)
//! - Scoring the dominant facial expression for amusement
//!
//! The core only depends on the [`FrameScorer`] contract. Production uses
//! the ONNX-backed [`OnnxScorer`]; tests use the deterministic
//! [`ScriptedScorer`] so nothing in the core ever loads a real model.

pub mod config;
pub mod frame;
pub mod onnx;
pub mod scripted;

pub use config::ScorerConfig;
pub use frame::DecodedFrame;
pub use onnx::OnnxScorer;
pub use scripted::ScriptedScorer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scorer error types
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),
}

/// Result of scoring one frame.
///
/// One tagged type for every outcome; no optional-field soup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreOutcome {
    /// A face was found and scored
    Detected {
        /// Amusement/happiness confidence in [0, 1]
        score: f32,
        /// Face detection confidence in [0, 1]
        confidence: f32,
    },
    /// No face in the frame
    NoFace,
}

impl ScoreOutcome {
    /// Whether a face was found
    pub fn face_found(&self) -> bool {
        matches!(self, ScoreOutcome::Detected { .. })
    }

    /// Amusement score, zero when no face was found
    pub fn score(&self) -> f32 {
        match self {
            ScoreOutcome::Detected { score, .. } => *score,
            ScoreOutcome::NoFace => 0.0,
        }
    }
}

/// Scores a decoded frame for amusement.
///
/// Implementations must be cheap to share across requests; scoring happens
/// outside any session lock.
pub trait FrameScorer: Send + Sync {
    fn score_frame(&self, frame: &DecodedFrame) -> Result<ScoreOutcome, ScorerError>;

    /// Human-readable backend description for health reporting
    fn backend(&self) -> &str;

    /// Whether a real model is loaded (vs. a fallback heuristic)
    fn is_model_loaded(&self) -> bool;
}
