//! Smirkle Backend API Server
//!
//! REST and WebSocket transport around the smirk detection core. Decodes
//! and validates incoming frames, invokes the frame scorer, feeds the
//! detection controller, and serializes decisions.

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use detection::DetectionController;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use scorer::{FrameScorer, OnnxScorer};
use serde::Serialize;
use session_store::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::Settings;

/// Application state shared across handlers
pub struct AppState {
    /// The smirk confirmation core
    pub controller: DetectionController,
    /// Amusement scorer (production ONNX adapter or a test double)
    pub scorer: Arc<dyn FrameScorer>,
    /// Session store, shared with the controller
    pub store: Arc<SessionStore>,
    /// Loaded settings
    pub settings: Settings,
    /// Start time for uptime reporting
    pub start_time: std::time::Instant,
    /// Prometheus render handle, when the exporter is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire up the store, controller, and scorer from settings
    pub fn new(
        settings: Settings,
        scorer: Arc<dyn FrameScorer>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let controller =
            DetectionController::new(settings.detection.clone(), Arc::clone(&store));
        Self {
            controller,
            scorer,
            store,
            settings,
            start_time: std::time::Instant::now(),
            metrics,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub(crate) fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub scorer_backend: String,
    pub model_loaded: bool,
    pub detection_threshold: f32,
    pub consecutive_frames_required: u32,
    pub active_sessions: usize,
    pub timestamp: String,
}

/// Scorer and model info response
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub scorer_backend: String,
    pub model_loaded: bool,
    pub model_path: Option<String>,
    pub input_size: u32,
    pub detection_threshold: f32,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/models", get(model_info_handler))
        .route(
            "/api/v1/analyze-emotion",
            post(routes::detection::analyze_emotion),
        )
        .route(
            "/api/v1/analyze-emotion/upload",
            post(routes::detection::analyze_emotion_upload),
        )
        .route(
            "/api/v1/session/:session_id/status",
            get(routes::session::session_status),
        )
        .route(
            "/api/v1/session/:session_id/reset",
            delete(routes::session::reset_session),
        )
        .route("/api/v1/ws", get(routes::ws::ws_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        scorer_backend: state.scorer.backend().to_string(),
        model_loaded: state.scorer.is_model_loaded(),
        detection_threshold: state.controller.config().smirk_threshold,
        consecutive_frames_required: state.controller.config().consecutive_frames_required,
        active_sessions: state.store.session_count().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Scorer and model info handler
async fn model_info_handler(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        scorer_backend: state.scorer.backend().to_string(),
        model_loaded: state.scorer.is_model_loaded(),
        model_path: state.settings.scorer.model_path.clone(),
        input_size: state.settings.scorer.input_size,
        detection_threshold: state.controller.config().smirk_threshold,
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server until shutdown
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Some(PrometheusBuilder::new().install_recorder()?);
    let scorer = Arc::new(OnnxScorer::new(settings.scorer.clone())?);

    let state = Arc::new(AppState::new(settings.clone(), scorer, metrics));
    let mut app = create_router(state);

    match rate_limit::governor_config(&settings.rate_limit) {
        Some(config) => app = app.layer(GovernorLayer { config }),
        None => warn!("Rate limiting disabled: governor configuration rejected"),
    }

    let addr = settings.bind_addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use scorer::{ScoreOutcome, ScriptedScorer};
    use tower::ServiceExt;

    const SESSION_A: &str = "550e8400-e29b-41d4-a716-446655440000";
    const SESSION_B: &str = "550e8400-e29b-41d4-a716-446655440001";

    fn test_app(scorer: ScriptedScorer) -> Router {
        create_router(Arc::new(AppState::new(
            Settings::default(),
            Arc::new(scorer),
            None,
        )))
    }

    fn frame_b64() -> String {
        let img = image::RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([(x * 60) as u8, (y * 60) as u8, 0])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        json_of(response).await
    }

    async fn post_json(
        app: &Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        json_of(response).await
    }

    async fn json_of(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_frame(app: &Router, session_id: &str, seq: u64) -> (StatusCode, serde_json::Value) {
        post_json(
            app,
            "/api/v1/analyze-emotion",
            serde_json::json!({
                "frame": frame_b64(),
                "session_id": session_id,
                "timestamp": 1000.0 + seq as f64 * 33.0,
                "frame_number": seq,
            }),
        )
        .await
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(ScriptedScorer::constant(0.0));
        let (status, body) = get_json(&app, "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scorer_backend"], "scripted");
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["detection_threshold"], 0.3);
        assert_eq!(body["consecutive_frames_required"], 3);
    }

    #[tokio::test]
    async fn test_model_info() {
        let app = test_app(ScriptedScorer::constant(0.0));
        let (status, body) = get_json(&app, "/api/v1/models").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scorer_backend"], "scripted");
        assert_eq!(body["model_loaded"], false);
        assert!(body["model_path"].is_null());
        assert_eq!(body["input_size"], 48);
        assert_eq!(body["detection_threshold"], 0.3);
    }

    #[tokio::test]
    async fn test_game_over_edge_after_three_consecutive_smirks() {
        let app = test_app(ScriptedScorer::constant(0.4));

        for seq in 0..2u64 {
            let (status, body) = post_frame(&app, SESSION_A, seq).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "success");
            assert_eq!(body["is_smirk"], true);
            assert_eq!(body["game_over"], false);
            assert_eq!(body["consecutive_smirk_count"], seq + 1);
        }

        let (_, body) = post_frame(&app, SESSION_A, 2).await;
        assert_eq!(body["game_over"], true);
        assert_eq!(body["smirk_reason"], "consecutive_frames");
        assert_eq!(body["game_over_reason"], "smirk_detected");

        // Fourth frame: still game over, reason not re-announced
        let (_, body) = post_frame(&app, SESSION_A, 3).await;
        assert_eq!(body["game_over"], true);
        assert!(body.get("smirk_reason").is_none());
        assert!(body.get("game_over_reason").is_none());
    }

    #[tokio::test]
    async fn test_no_face_resets_streak() {
        let app = test_app(ScriptedScorer::from_outcomes(vec![
            ScoreOutcome::Detected { score: 0.9, confidence: 0.9 },
            ScoreOutcome::NoFace,
            ScoreOutcome::Detected { score: 0.9, confidence: 0.9 },
        ]));

        let (_, body) = post_frame(&app, SESSION_A, 0).await;
        assert_eq!(body["consecutive_smirk_count"], 1);

        let (status, body) = post_frame(&app, SESSION_A, 1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_face_detected");
        assert_eq!(body["face_detected"], false);
        assert_eq!(body["consecutive_smirk_count"], 0);

        let (_, body) = post_frame(&app, SESSION_A, 2).await;
        assert_eq!(body["consecutive_smirk_count"], 1);
        assert_eq!(body["game_over"], false);
    }

    #[tokio::test]
    async fn test_scorer_failure_degrades_to_miss() {
        let app = test_app(ScriptedScorer::failing("model outage"));

        let (status, body) = post_frame(&app, SESSION_A, 0).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["face_detected"], false);
        assert_eq!(body["consecutive_smirk_count"], 0);
        assert_eq!(body["game_over"], false);
    }

    #[tokio::test]
    async fn test_boundary_validation() {
        let app = test_app(ScriptedScorer::constant(0.9));

        let (status, body) = post_json(
            &app,
            "/api/v1/analyze-emotion",
            serde_json::json!({"frame": frame_b64(), "session_id": "not-a-uuid", "timestamp": 1.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_SESSION_ID");

        let (status, body) = post_json(
            &app,
            "/api/v1/analyze-emotion",
            serde_json::json!({"session_id": SESSION_A, "timestamp": 1.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MISSING_FRAME");

        let (status, body) = post_json(
            &app,
            "/api/v1/analyze-emotion",
            serde_json::json!({"frame": "!!!", "session_id": SESSION_A, "timestamp": 1.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_FRAME");

        // Validation happens before any state is touched
        let (_, body) = get_json(&app, &format!("/api/v1/session/{}/status", SESSION_A)).await;
        assert_eq!(body["consecutive_smirk_count"], 0);
    }

    #[tokio::test]
    async fn test_status_and_reset_endpoints() {
        let app = test_app(ScriptedScorer::constant(0.9));

        for seq in 0..3u64 {
            post_frame(&app, SESSION_A, seq).await;
        }

        let (status, body) = get_json(&app, &format!("/api/v1/session/{}/status", SESSION_A)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["game_over"], true);
        assert_eq!(body["consecutive_smirk_count"], 3);
        assert!(body["smirk_detected_at"].is_number());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/session/{}/reset", SESSION_A))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, body) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "reset");

        let (_, body) = get_json(&app, &format!("/api/v1/session/{}/status", SESSION_A)).await;
        assert_eq!(body["game_over"], false);
        assert_eq!(body["consecutive_smirk_count"], 0);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let app = test_app(ScriptedScorer::constant(0.9));

        for seq in 0..3u64 {
            post_frame(&app, SESSION_A, seq).await;
        }
        post_frame(&app, SESSION_B, 0).await;

        let (_, body) = get_json(&app, &format!("/api/v1/session/{}/status", SESSION_B)).await;
        assert_eq!(body["game_over"], false);
        assert_eq!(body["consecutive_smirk_count"], 1);
    }

    #[tokio::test]
    async fn test_invalid_session_id_on_session_routes() {
        let app = test_app(ScriptedScorer::constant(0.9));

        let (status, body) = get_json(&app, "/api/v1/session/nope/status").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_SESSION_ID");
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let app = test_app(ScriptedScorer::constant(0.9));

        let img = image::RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([(x * 60) as u8, (y * 60) as u8, 0])
        });
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let boundary = "frame-boundary";
        let mut body = Vec::new();
        for (name, value) in [
            ("session_id", SESSION_A.as_bytes().to_vec()),
            ("timestamp", b"1000.0".to_vec()),
            ("frame_number", b"0".to_vec()),
            ("file", png.into_inner()),
        ] {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"{}\r\n\r\n",
                    if name == "file" {
                        "; filename=\"frame.png\"\r\nContent-Type: image/png"
                    } else {
                        ""
                    }
                )
                .as_bytes(),
            );
            body.extend_from_slice(&value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyze-emotion/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, body) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["is_smirk"], true);
        assert_eq!(body["consecutive_smirk_count"], 1);
    }

    #[tokio::test]
    async fn test_metrics_route_without_recorder() {
        let app = test_app(ScriptedScorer::constant(0.0));
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
