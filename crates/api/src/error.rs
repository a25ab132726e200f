//! API error responses
//!
//! All boundary failures share one JSON shape:
//! `{status: "error", error: CODE, message, timestamp}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use detection::DetectionError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid session ID format")]
    InvalidSessionId,

    #[error("Session ID is required")]
    MissingSessionId,

    #[error("Frame data is required")]
    MissingFrame,

    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidSessionId => "INVALID_SESSION_ID",
            ApiError::MissingSessionId => "MISSING_SESSION_ID",
            ApiError::MissingFrame => "MISSING_FRAME",
            ApiError::InvalidFrame(_) => "INVALID_FRAME",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::EmptySessionId => ApiError::MissingSessionId,
            DetectionError::InternalState(msg) => {
                // Invariant violations mean the single-writer discipline
                // failed; surface loudly, never guess around them.
                error!("Session state invariant violation: {}", msg);
                ApiError::Internal(msg)
            }
        }
    }
}

/// Wire shape for error responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            error: self.code(),
            message: self.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
