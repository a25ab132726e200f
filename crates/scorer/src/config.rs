//! Scorer configuration

use serde::{Deserialize, Serialize};

/// Scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Path to the emotion-classification ONNX model. When absent the
    /// scorer falls back to a deterministic heuristic.
    pub model_path: Option<String>,

    /// Model input edge length (square grayscale crop)
    pub input_size: u32,

    /// Index of the "happy" channel in the model output
    pub happy_index: usize,

    /// Face detection confidence reported for heuristic scoring
    pub heuristic_confidence: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 48,
            happy_index: 3,
            heuristic_confidence: 0.5,
        }
    }
}
