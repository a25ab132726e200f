//! Per-IP rate limiting via the GCRA algorithm (tower_governor).
//!
//! Frame streaming runs at webcam rates, so the default quota replenishes
//! several permits per second with a burst deep enough to absorb a short
//! client-side backlog flush.

use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config with X-RateLimit-* response headers enabled
pub type FrameGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Permits replenished per second
    #[serde(default = "default_per_second")]
    pub per_second: u64,

    /// Requests a client may burst before throttling kicks in
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_per_second() -> u64 {
    20
}

fn default_burst_size() -> u32 {
    40
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Build a shareable governor config for [`tower_governor::GovernorLayer`].
///
/// Requires the service to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` so peer IPs are
/// available to the key extractor.
pub fn governor_config(config: &RateLimitConfig) -> Option<Arc<FrameGovernorConfig>> {
    // Floor at 1ms: integer division would produce a zero period (and a
    // rejected config) for replenish rates above 1000/s
    let period_ms = (1000 / config.per_second.max(1)).max(1);
    GovernorConfigBuilder::default()
        .period(std::time::Duration::from_millis(period_ms))
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quota_covers_webcam_rates() {
        let config = RateLimitConfig::default();
        assert!(config.per_second >= 15);
        assert!(config.burst_size >= config.per_second as u32);
    }

    #[test]
    fn test_governor_config_builds() {
        assert!(governor_config(&RateLimitConfig::default()).is_some());
    }

    #[test]
    fn test_high_replenish_rates_still_build() {
        // Above 1000/s the naive period computation truncates to zero;
        // the floor keeps the limiter enabled instead of silently off
        let config = RateLimitConfig {
            per_second: 5000,
            burst_size: 100,
        };
        assert!(governor_config(&config).is_some());
    }
}
