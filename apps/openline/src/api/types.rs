//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use openline_core::{Acceptance, Digest, Frame, GuardViolation, Telemetry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            ok: true,
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error body shared by every endpoint.
///
/// Guard violations fill `code`, `cap` and `observed`; the 413 body fills
/// them with the byte limit and the body size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
}

impl ErrorResponse {
    pub fn new(code: &str, msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: msg.into(),
            code: Some(code.to_string()),
            cap: None,
            observed: None,
        }
    }

    pub fn too_large(limit: usize, size: usize) -> Self {
        Self {
            cap: Some(limit as f64),
            observed: Some(size as f64),
            ..Self::new(
                "frame_too_large",
                format!("Frame body of {} bytes exceeds limit of {} bytes", size, limit),
            )
        }
    }

    pub fn rate_limited(bucket: &str, rps: u32) -> Self {
        Self {
            cap: Some(f64::from(rps)),
            ..Self::new(
                "rate_limited",
                format!("Rate limit of {} requests/second exceeded for /{}", rps, bucket),
            )
        }
    }

    pub fn from_violation(violation: &GuardViolation) -> Self {
        Self {
            cap: Some(violation.cap()),
            observed: Some(violation.observed()),
            ..Self::new(violation.code(), violation.to_string())
        }
    }
}

// =============================================================================
// FRAME RESPONSE
// =============================================================================

/// Accepted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResponse {
    pub ok: bool,
    pub stream_id: String,
    pub logical_time: u64,
    pub digest: Digest,
    pub telem: Telemetry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<Digest>,
}

impl From<Acceptance> for FrameResponse {
    fn from(acceptance: Acceptance) -> Self {
        Self {
            ok: true,
            stream_id: acceptance.stream_id,
            logical_time: acceptance.logical_time,
            digest: acceptance.digest,
            telem: acceptance.telemetry,
            prior: acceptance.prior,
        }
    }
}

// =============================================================================
// EXTRACT REQUEST/RESPONSE
// =============================================================================

/// Build a frame from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default, alias = "stream")]
    pub stream_id: Option<String>,
    #[serde(default, alias = "t_logical")]
    pub logical_time: Option<u64>,
    /// Client-supplied prior; the gap is measured with the JSD.
    #[serde(default)]
    pub prior_digest: Option<Digest>,
    /// Measure against the stream's latest committed digest instead.
    #[serde(default)]
    pub use_stream_prior: bool,
}

/// Stream id used when an extract request names none.
pub const DEFAULT_EXTRACT_STREAM: &str = "default";

/// Built, uncommitted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub ok: bool,
    pub frame: Frame,
}

// =============================================================================
// STREAM RESPONSE
// =============================================================================

/// Latest committed digest of a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    pub ok: bool,
    pub stream_id: String,
    pub digest: Digest,
}

// =============================================================================
// SCHEMA RESPONSE
// =============================================================================

/// Schema bundle and its BLAKE3 fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub ok: bool,
    pub hash: String,
    pub schema: Value,
}
