//! Frame Analysis Routes

use axum::extract::{Multipart, State};
use axum::Json;
use detection::{FrameObservation, GameOverReason};
use metrics::counter;
use scorer::{DecodedFrame, ScoreOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::validate_session_id;
use crate::{now_ms, AppState};

/// Request to analyze a single webcam frame
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRequest {
    /// Base64-encoded image, with or without a data-URI prefix
    #[serde(default)]
    pub frame: Option<String>,

    /// Game session identifier (UUID)
    #[serde(default)]
    pub session_id: Option<String>,

    /// Client-side timestamp in milliseconds
    #[serde(default)]
    pub timestamp: Option<f64>,

    /// Sequential frame number (advisory ordering hint)
    #[serde(default)]
    pub frame_number: Option<u64>,
}

/// Detection outcome category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Success,
    NoFaceDetected,
    Error,
}

/// Response for a single analyzed frame
#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub status: DetectionStatus,
    pub session_id: String,
    pub detection_id: String,
    /// Server-side timestamp (ms)
    pub timestamp: f64,
    pub processing_time_ms: f64,
    pub face_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub happiness: Option<f32>,
    pub is_smirk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smirk_reason: Option<&'static str>,
    pub consecutive_smirk_count: u32,
    pub game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over_reason: Option<&'static str>,
    pub score_clamped: bool,
}

/// POST /api/v1/analyze-emotion
pub async fn analyze_emotion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<DetectionResponse>, ApiError> {
    analyze(&state, request).await.map(Json)
}

/// POST /api/v1/analyze-emotion/upload
///
/// Multipart alternative to the base64 body: `file` carries the encoded
/// image, `session_id`/`timestamp`/`frame_number` come as text fields.
pub async fn analyze_emotion_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DetectionResponse>, ApiError> {
    let mut session_id = None;
    let mut timestamp = None;
    let mut frame_number = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidFrame(e.to_string()))?
    {
        match field.name() {
            Some("session_id") => {
                session_id = field.text().await.ok();
            }
            Some("timestamp") => {
                timestamp = field.text().await.ok().and_then(|t| t.parse().ok());
            }
            Some("frame_number") => {
                frame_number = field.text().await.ok().and_then(|t| t.parse().ok());
            }
            Some("file") => {
                file = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::InvalidFrame(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let session_id = validate_session_id(session_id.as_deref())?.to_string();
    let file = file.ok_or(ApiError::MissingFrame)?;
    let decoded = DecodedFrame::from_image_bytes(&file)
        .map_err(|e| ApiError::InvalidFrame(e.to_string()))?;

    analyze_decoded(&state, session_id, decoded, timestamp, frame_number)
        .await
        .map(Json)
}

/// Shared base64 pipeline for the REST route and the WebSocket stream
pub(crate) async fn analyze(
    state: &AppState,
    request: FrameRequest,
) -> Result<DetectionResponse, ApiError> {
    let session_id = validate_session_id(request.session_id.as_deref())?.to_string();

    let frame = match request.frame.as_deref() {
        Some(frame) if !frame.is_empty() => frame,
        _ => return Err(ApiError::MissingFrame),
    };
    let decoded =
        DecodedFrame::from_base64(frame).map_err(|e| ApiError::InvalidFrame(e.to_string()))?;

    analyze_decoded(state, session_id, decoded, request.timestamp, request.frame_number).await
}

/// Score a decoded frame and run it through the controller.
///
/// Scoring happens before the session lock is taken; a scorer failure
/// degrades to a missed frame so outages can never advance the streak.
async fn analyze_decoded(
    state: &AppState,
    session_id: String,
    decoded: DecodedFrame,
    timestamp: Option<f64>,
    frame_number: Option<u64>,
) -> Result<DetectionResponse, ApiError> {
    let started = Instant::now();

    let (status, score, face_found) = match state.scorer.score_frame(&decoded) {
        Ok(ScoreOutcome::Detected { score, .. }) => (DetectionStatus::Success, score, true),
        Ok(ScoreOutcome::NoFace) => (DetectionStatus::NoFaceDetected, 0.0, false),
        Err(e) => {
            warn!(session_id, "Frame scoring failed: {}", e);
            counter!("smirkle_scorer_failures_total").increment(1);
            (DetectionStatus::Error, 0.0, false)
        }
    };

    let timestamp_ms = timestamp.unwrap_or_else(now_ms);
    let decision = state
        .controller
        .evaluate(
            &session_id,
            FrameObservation {
                score,
                face_found,
                frame_seq: frame_number,
                timestamp_ms,
            },
        )
        .await?;

    counter!("smirkle_frames_analyzed_total").increment(1);
    if decision.reason.is_some() {
        counter!("smirkle_confirmations_total").increment(1);
    }

    let confirmed_now = decision.reason == Some(GameOverReason::ConsecutiveFrames);
    Ok(DetectionResponse {
        status,
        session_id,
        detection_id: Uuid::new_v4().to_string(),
        timestamp: now_ms(),
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        face_detected: face_found,
        happiness: face_found.then_some(score),
        is_smirk: decision.is_smirk,
        smirk_reason: confirmed_now.then_some("consecutive_frames"),
        consecutive_smirk_count: decision.consecutive_hit_count,
        game_over: decision.game_over,
        game_over_reason: confirmed_now.then_some("smirk_detected"),
        score_clamped: decision.score_clamped,
    })
}
