//! Session Routes

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::routes::validate_session_id;
use crate::AppState;

/// Response for the session status endpoint
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub consecutive_smirk_count: u32,
    pub last_detection_time: Option<f64>,
    pub smirk_detected_at: Option<f64>,
    pub game_over: bool,
}

/// Response for the session reset endpoint
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /api/v1/session/:session_id/status
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    validate_session_id(Some(&session_id))?;

    let snapshot = state.controller.status(&session_id).await?;
    Ok(Json(SessionStatusResponse {
        session_id,
        consecutive_smirk_count: snapshot.consecutive_hit_count,
        last_detection_time: snapshot.last_update_ms,
        smirk_detected_at: snapshot.confirmed_at_ms,
        game_over: snapshot.game_over,
    }))
}

/// DELETE /api/v1/session/:session_id/reset
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    validate_session_id(Some(&session_id))?;

    state.controller.reset(&session_id).await?;
    info!(session_id, "Session reset via API");

    Ok(Json(ResetResponse {
        session_id,
        status: "reset",
        message: "Session detection state has been reset",
    }))
}
