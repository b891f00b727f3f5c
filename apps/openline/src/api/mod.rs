//! # OpenLine HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `POST /frame` - Submit a frame (bare or wrapped as `{"frame": ...}`)
//! - `POST /extract` - Build a frame from text without committing it
//! - `GET /streams/{stream_id}` - Latest committed digest of a stream
//! - `GET /schema` - JSON Schema bundle and its BLAKE3 hash
//! - `GET /health` - Health check
//!
//! ## Configuration (Environment Variables)
//!
//! - `OPENLINE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `OPENLINE_RATE_LIMIT`: Requests per second per endpoint (default: 100, 0 to disable)

mod handlers;
mod middleware;
mod types;

pub use middleware::{BusRateLimiter, create_rate_limiter, get_rate_limit_from_env, route_bucket};
// Re-export handlers and types for integration tests (via `openline::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    error_response, extract_handler, frame_handler, health_handler, schema_handler,
    stream_handler,
};
#[allow(unused_imports)]
pub use types::{
    DEFAULT_EXTRACT_STREAM, ErrorResponse, ExtractRequest, ExtractResponse, FrameResponse,
    HealthResponse, SchemaResponse, StreamResponse,
};

use crate::config::{AppConfig, DEFAULT_RATE_LIMIT};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use openline_core::{FrameService, OpenlineError, primitives::MAX_FRAME_BYTES};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Headroom above `max_frame_bytes` for the transport body limit, so the
/// frame handler sees oversized frames and answers with its own 413 body.
const BODY_LIMIT_SLACK_BYTES: usize = 64 * 1024;

/// Transport body limit for a configured frame limit.
pub fn body_limit_for(max_frame_bytes: usize) -> usize {
    max_frame_bytes.saturating_add(BODY_LIMIT_SLACK_BYTES)
}

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the frame service.
#[derive(Clone)]
pub struct AppState {
    /// The acceptance path; owns the stream store.
    pub service: Arc<FrameService>,
    /// Largest accepted `POST /frame` body.
    pub max_frame_bytes: usize,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl AppState {
    /// Create new app state with default limits.
    #[must_use]
    pub fn new(service: FrameService) -> Self {
        Self {
            service: Arc::new(service),
            max_frame_bytes: MAX_FRAME_BYTES,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }

    /// Create app state from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            service: Arc::new(config.build_service()),
            max_frame_bytes: config.server.max_frame_bytes,
            rate_limit: config.server.rate_limit,
        }
    }

    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `OPENLINE_CORS_ORIGINS`:
/// - If "*": allows all origins
/// - If not set: defaults to localhost only
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("OPENLINE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (OPENLINE_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|trimmed| match trimmed.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", trimmed);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in OPENLINE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::info!("CORS: No OPENLINE_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - `max_frame_bytes` plus slack, before handlers run
/// 4. Rate Limiting - per-endpoint quota (if enabled)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();
    let body_limit = body_limit_for(state.max_frame_bytes);

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/frame", post(handlers::frame_handler))
        .route("/extract", post(handlers::extract_handler))
        .route("/streams/{stream_id}", get(handlers::stream_handler))
        .route("/schema", get(handlers::schema_handler));

    if state.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second per endpoint", state.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(state.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), OpenlineError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OpenlineError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("OpenLine HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| OpenlineError::IoError(format!("Server error: {}", e)))
}
