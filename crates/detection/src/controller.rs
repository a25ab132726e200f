//! Detection Controller Implementation

use crate::config::DetectionConfig;
use crate::decision::{Decision, FrameObservation, GameOverReason};
use crate::DetectionError;
use session_store::{SessionRecord, SessionSnapshot, SessionStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies the consecutive-frame confirmation protocol to scored frames.
///
/// Thresholds are injected at construction; all state lives in the
/// injected [`SessionStore`]. Each evaluation touches exactly one session
/// record, under that record's lock, with no await points inside the
/// critical section.
pub struct DetectionController {
    config: DetectionConfig,
    store: Arc<SessionStore>,
}

impl DetectionController {
    /// Create a controller with the given thresholds and backing store
    pub fn new(config: DetectionConfig, store: Arc<SessionStore>) -> Self {
        info!(
            smirk_threshold = config.smirk_threshold,
            consecutive_frames_required = config.consecutive_frames_required,
            "Creating detection controller"
        );
        Self { config, store }
    }

    /// Controller thresholds
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Evaluate one scored frame for a session.
    ///
    /// Scoring happens before this call; the state transition here is
    /// synchronous and cheap, so a cancelled request can never abandon a
    /// half-applied update.
    pub async fn evaluate(
        &self,
        session_id: &str,
        observation: FrameObservation,
    ) -> Result<Decision, DetectionError> {
        let record = self.store.get_or_create(session_id).await?;
        let mut record = record.lock().await;

        if !record.invariants_hold() {
            error!(
                session_id,
                terminal = record.terminal,
                confirmed_at_ms = ?record.confirmed_at_ms,
                "Session record invariant violated"
            );
            return Err(DetectionError::InternalState(format!(
                "terminal={} with confirmed_at={:?} for session {}",
                record.terminal, record.confirmed_at_ms, session_id
            )));
        }

        Ok(apply_observation(&self.config, session_id, &mut record, &observation))
    }

    /// Reset a session's detection state (idempotent, creates if absent)
    pub async fn reset(&self, session_id: &str) -> Result<(), DetectionError> {
        self.store.reset(session_id).await?;
        Ok(())
    }

    /// Snapshot of a session's state. Unknown sessions report the
    /// zero-initialized snapshot without creating any state, so status
    /// queries are strictly read-only.
    pub async fn status(
        &self,
        session_id: &str,
    ) -> Result<SessionSnapshot, DetectionError> {
        if session_id.is_empty() {
            return Err(DetectionError::EmptySessionId);
        }
        Ok(self.store.status(session_id).await.unwrap_or_default())
    }
}

/// Pure state transition: one session record + one observation -> decision.
fn apply_observation(
    config: &DetectionConfig,
    session_id: &str,
    record: &mut SessionRecord,
    observation: &FrameObservation,
) -> Decision {
    // Clamp out-of-range scores rather than rejecting; noisy upstream
    // models occasionally emit values slightly outside [0, 1]. NaN and
    // infinities count as out-of-range too, with NaN landing on 0.0.
    let (score, score_clamped) = if !observation.score.is_finite() {
        (if observation.score == f32::INFINITY { 1.0 } else { 0.0 }, true)
    } else if observation.score < 0.0 {
        (0.0, true)
    } else if observation.score > 1.0 {
        (1.0, true)
    } else {
        (observation.score, false)
    };
    if score_clamped {
        warn!(
            session_id,
            raw_score = observation.score,
            "Clamped out-of-range amusement score"
        );
    }

    // Frame ordering is advisory telemetry only, never a gate
    if let Some(seq) = observation.frame_seq {
        if let Some(max_seen) = record.max_frame_seq {
            if seq <= max_seen {
                debug!(session_id, seq, max_seen, "Out-of-order or duplicate frame");
            }
        }
        record.max_frame_seq = Some(record.max_frame_seq.map_or(seq, |m| m.max(seq)));
    }

    record.last_update_ms = Some(observation.timestamp_ms);

    // A lost face is evidence against a sustained smirk: it cancels the
    // streak but never touches the terminal state.
    let hit = observation.face_found && score >= config.smirk_threshold;
    if hit {
        record.consecutive_hit_count += 1;
    } else {
        record.consecutive_hit_count = 0;
    }

    // Confirmation is a one-time edge; the reason is only reported on the
    // exact frame that crosses the threshold.
    let mut reason = None;
    if record.consecutive_hit_count >= config.consecutive_frames_required && !record.terminal {
        record.terminal = true;
        record.confirmed_at_ms = Some(observation.timestamp_ms);
        reason = Some(GameOverReason::ConsecutiveFrames);
        info!(
            session_id,
            streak = record.consecutive_hit_count,
            confirmed_at_ms = observation.timestamp_ms,
            "Smirk confirmed, game over"
        );
    }

    Decision {
        is_smirk: hit,
        consecutive_hit_count: record.consecutive_hit_count,
        game_over: record.terminal,
        reason,
        confirmed_at_ms: record.confirmed_at_ms,
        score_clamped,
    }
}
