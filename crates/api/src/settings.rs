//! Server settings
//!
//! Loaded from an optional `config/smirkle.*` file with `SMIRKLE_`-prefixed
//! environment overrides (e.g. `SMIRKLE_DETECTION__SMIRK_THRESHOLD=0.5`).

use crate::rate_limit::RateLimitConfig;
use config::{Config, ConfigError, Environment, File};
use detection::DetectionConfig;
use scorer::ScorerConfig;
use serde::Deserialize;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Smirk confirmation thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Frame scorer configuration
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// Per-IP rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            detection: DetectionConfig::default(),
            scorer: ScorerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/smirkle").required(false))
            .add_source(Environment::with_prefix("SMIRKLE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.detection.smirk_threshold, 0.3);
        assert_eq!(settings.detection.consecutive_frames_required, 3);
        assert!(settings.scorer.model_path.is_none());
    }
}
