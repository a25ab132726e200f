//! Route Handlers

pub mod detection;
pub mod session;
pub mod ws;

use crate::error::ApiError;
use uuid::Uuid;

/// Validate a session id at the boundary: required, non-empty, UUID-shaped.
pub(crate) fn validate_session_id(session_id: Option<&str>) -> Result<&str, ApiError> {
    let session_id = match session_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ApiError::MissingSessionId),
    };
    Uuid::parse_str(session_id).map_err(|_| ApiError::InvalidSessionId)?;
    Ok(session_id)
}
