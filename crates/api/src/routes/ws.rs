//! WebSocket Streaming Route
//!
//! Persistent bidirectional frame stream:
//! - client sends `{"type": "frame", "frame": ..., "session_id": ..., ...}`
//! - server replies `{"type": "detection_result", "payload": {...}}`
//! - `ping`/`pong` keepalive
//!
//! Malformed messages get a typed error reply and the loop continues; a
//! disconnect mid-frame cannot leave a session lock held because state
//! transitions are synchronous once scoring is done.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::routes::detection::{analyze, DetectionResponse, FrameRequest};
use crate::{now_ms, AppState};

/// Messages accepted from the client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Frame(FrameRequest),
    Ping,
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    DetectionResult { payload: DetectionResponse },
    Pong { timestamp: f64 },
    Error { error: &'static str, message: String },
}

/// GET /api/v1/ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket client connected");

    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Binary frames and protocol-level ping/pong are ignored
            _ => continue,
        };

        let reply = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Frame(request)) => match analyze(&state, request).await {
                Ok(payload) => ServerMessage::DetectionResult { payload },
                Err(e) => ServerMessage::Error {
                    error: e.code(),
                    message: e.to_string(),
                },
            },
            Ok(ClientMessage::Ping) => ServerMessage::Pong { timestamp: now_ms() },
            Err(e) => {
                debug!("Unparseable WebSocket message: {}", e);
                ServerMessage::Error {
                    error: "INVALID_MESSAGE",
                    message: e.to_string(),
                }
            }
        };

        let Ok(encoded) = serde_json::to_string(&reply) else {
            continue;
        };
        if socket.send(Message::Text(encoded)).await.is_err() {
            break;
        }
    }

    info!("WebSocket client disconnected");
}
