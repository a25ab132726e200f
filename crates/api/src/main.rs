//! Smirkle Backend - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let settings = Settings::load()?;
    info!("=== Smirkle Backend v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Smirk threshold {} over {} consecutive frames",
        settings.detection.smirk_threshold, settings.detection.consecutive_frames_required
    );

    run_server(settings).await
}
