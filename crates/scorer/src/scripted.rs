//! Deterministic scorer for tests

use crate::frame::DecodedFrame;
use crate::{FrameScorer, ScoreOutcome, ScorerError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted outcome for one frame
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Outcome(ScoreOutcome),
    Fail(String),
}

/// Test adapter that replays a programmed sequence of outcomes, then
/// repeats the last one. Lets core and transport tests exercise every
/// scorer behavior without touching a model.
pub struct ScriptedScorer {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    last: ScriptedOutcome,
}

impl ScriptedScorer {
    /// Scorer that always reports the same detection score
    pub fn constant(score: f32) -> Self {
        Self::from_outcomes(vec![ScoreOutcome::Detected {
            score,
            confidence: 0.9,
        }])
    }

    /// Scorer that never finds a face
    pub fn no_face() -> Self {
        Self::from_outcomes(vec![ScoreOutcome::NoFace])
    }

    /// Scorer that always fails
    pub fn failing(message: &str) -> Self {
        Self::new(vec![ScriptedOutcome::Fail(message.to_string())])
    }

    pub fn from_outcomes(outcomes: Vec<ScoreOutcome>) -> Self {
        Self::new(outcomes.into_iter().map(ScriptedOutcome::Outcome).collect())
    }

    pub fn new(script: Vec<ScriptedOutcome>) -> Self {
        assert!(!script.is_empty(), "script must not be empty");
        let last = script[script.len() - 1].clone();
        Self {
            script: Mutex::new(script.into()),
            last,
        }
    }
}

impl FrameScorer for ScriptedScorer {
    fn score_frame(&self, _frame: &DecodedFrame) -> Result<ScoreOutcome, ScorerError> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());

        match next {
            ScriptedOutcome::Outcome(outcome) => Ok(outcome),
            ScriptedOutcome::Fail(message) => Err(ScorerError::Inference(message)),
        }
    }

    fn backend(&self) -> &str {
        "scripted"
    }

    fn is_model_loaded(&self) -> bool {
        false
    }
}
