//! Detection configuration

use serde::{Deserialize, Serialize};

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Amusement score at or above which a frame counts as a hit
    pub smirk_threshold: f32,

    /// Consecutive hits required before the game ends
    pub consecutive_frames_required: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            smirk_threshold: 0.3,
            consecutive_frames_required: 3,
        }
    }
}

impl DetectionConfig {
    /// Create strict config (ends games sooner)
    pub fn strict() -> Self {
        Self {
            smirk_threshold: 0.2,
            consecutive_frames_required: 2,
        }
    }

    /// Create lenient config (tolerates brief expressions)
    pub fn lenient() -> Self {
        Self {
            smirk_threshold: 0.5,
            consecutive_frames_required: 5,
        }
    }
}
