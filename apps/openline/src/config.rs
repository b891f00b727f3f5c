//! # Configuration
//!
//! TOML configuration for the OpenLine server.
//!
//! ## Resolution Order
//!
//! 1. `--config <path>` if given (must exist)
//! 2. `openline.toml` in the working directory if present
//! 3. Built-in defaults
//!
//! Environment variables override the file:
//! - `OPENLINE_RATE_LIMIT`: requests per second (0 disables limiting)
//! - `OPENLINE_PARAMS_PATH`: tuned thresholds JSON file
//!
//! ## Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! max_frame_bytes = 256000
//! rate_limit = 100
//!
//! [guard]
//! cycle_cap = 4
//! delta_hol_cap = 2.0
//!
//! [guard.asset_caps]
//! equity = 0.03
//!
//! [thresholds]
//! params_path = "tuned_params.json"
//! ttl_secs = 60
//! ```

use crate::api::get_rate_limit_from_env;
use openline_core::{
    FrameService, GuardConfig, GuardEngine, InMemoryStreamStore, OpenlineError, StaticThresholds,
    ThresholdSource, TunedThresholds, primitives::MAX_FRAME_BYTES,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "openline.toml";

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted `POST /frame` body.
    pub max_frame_bytes: usize,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_frame_bytes: MAX_FRAME_BYTES,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[thresholds]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Tuned `scale_caps` file. Without it the guard uses computed caps only.
    pub params_path: Option<PathBuf>,
    pub ttl_secs: u64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            params_path: None,
            ttl_secs: 60,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub guard: GuardConfig,
    pub thresholds: ThresholdsConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, OpenlineError> {
        toml::from_str(text)
            .map_err(|e| OpenlineError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Load configuration following the resolution order, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, OpenlineError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::read_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, OpenlineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OpenlineError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `OPENLINE_RATE_LIMIT` and `OPENLINE_PARAMS_PATH`.
    pub fn apply_env(&mut self) {
        self.server.rate_limit = get_rate_limit_from_env(self.server.rate_limit);
        if let Ok(path) = std::env::var("OPENLINE_PARAMS_PATH")
            && !path.trim().is_empty()
        {
            self.thresholds.params_path = Some(PathBuf::from(path.trim()));
        }
    }

    /// Threshold source described by the `[thresholds]` section.
    pub fn threshold_source(&self) -> Arc<dyn ThresholdSource> {
        match &self.thresholds.params_path {
            Some(path) => {
                tracing::info!("Tuned thresholds: {}", path.display());
                Arc::new(TunedThresholds::new(
                    path.clone(),
                    Duration::from_secs(self.thresholds.ttl_secs),
                ))
            }
            None => Arc::new(StaticThresholds::default()),
        }
    }

    /// Frame service with an in-memory store and the configured guards.
    pub fn build_service(&self) -> FrameService {
        FrameService::new(
            Arc::new(InMemoryStreamStore::new()),
            self.threshold_source(),
            GuardEngine::new(self.guard.clone()),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.max_frame_bytes, 256_000);
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [guard]
            cycle_cap = 6

            [thresholds]
            params_path = "caps.json"
            "#,
        )
        .expect("parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.guard.cycle_cap, 6);
        assert!((config.guard.delta_hol_cap - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.params_path, Some(PathBuf::from("caps.json")));
        assert_eq!(config.thresholds.ttl_secs, 60);
    }

    #[test]
    fn invalid_toml_is_serialization_error() {
        let err = AppConfig::from_toml("[server\nport = ").expect_err("invalid");
        assert!(matches!(err, OpenlineError::SerializationError(_)));
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let err = AppConfig::read_file(Path::new("/nonexistent/openline.toml")).expect_err("missing");
        assert!(matches!(err, OpenlineError::IoError(_)));
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[server]\nmax_frame_bytes = 1024").expect("write");
        let config = AppConfig::read_file(file.path()).expect("read");
        assert_eq!(config.server.max_frame_bytes, 1024);
    }

    #[test]
    fn service_uses_configured_guard() {
        let mut config = AppConfig::default();
        config.guard.cycle_cap = 9;
        let service = config.build_service();
        assert_eq!(service.guard().config().cycle_cap, 9);
    }
}
