//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! The core is synchronous and bounded. Submissions run on the blocking pool
//! because tuned thresholds may be re-read from disk during a submit; the
//! other handlers call the core directly.

use super::{
    AppState,
    types::{
        DEFAULT_EXTRACT_STREAM, ErrorResponse, ExtractRequest, ExtractResponse, FrameResponse,
        HealthResponse, SchemaResponse, StreamResponse,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use openline_core::{
    Acceptance, Frame, FrameBuilder, FrameService, OpenlineError, PriorDigest, decode_frame,
    schema::{frame_schema, schema_hash},
};
use serde_json::Value;
use std::sync::Arc;

/// Map a core error to its status code and error body.
pub fn error_response(err: &OpenlineError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        OpenlineError::InvalidFrame(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid_frame", e.to_string())),
        ),
        OpenlineError::GuardViolation(v) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::from_violation(v)),
        ),
        OpenlineError::StreamConflict(_) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("stream_conflict", err.to_string())),
        ),
        OpenlineError::SerializationError(_) | OpenlineError::IoError(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("internal", err.to_string())),
        ),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// FRAME HANDLER
// =============================================================================

/// Run `FrameService::submit` off the async workers.
async fn submit_blocking(
    service: Arc<FrameService>,
    frame: Frame,
) -> Result<Acceptance, OpenlineError> {
    tokio::task::spawn_blocking(move || service.submit(frame))
        .await
        .map_err(|e| OpenlineError::IoError(format!("Submission task failed: {}", e)))?
}

/// Submit a frame for acceptance.
pub async fn frame_handler(State(state): State<AppState>, body: Bytes) -> Response {
    if body.len() > state.max_frame_bytes {
        tracing::warn!(size = body.len(), limit = state.max_frame_bytes, "frame body too large");
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse::too_large(state.max_frame_bytes, body.len())),
        )
            .into_response();
    }

    let frame = match decode_frame(&body) {
        Ok(frame) => frame,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("malformed_frame", e.to_string())),
            )
                .into_response();
        }
    };

    match submit_blocking(Arc::clone(&state.service), frame).await {
        Ok(acceptance) => (StatusCode::OK, Json(FrameResponse::from(acceptance))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// =============================================================================
// EXTRACT HANDLER
// =============================================================================

/// Build a frame from text without committing it.
pub async fn extract_handler(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Response {
    if request.text.len() > state.max_frame_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse::too_large(
                state.max_frame_bytes,
                request.text.len(),
            )),
        )
            .into_response();
    }

    let stream_id = request
        .stream_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTRACT_STREAM.to_string());

    let prior = match request.prior_digest {
        Some(digest) => Some(PriorDigest::Untrusted(digest)),
        None if request.use_stream_prior => match state.service.latest(&stream_id) {
            Ok(latest) => latest.map(PriorDigest::Trusted),
            Err(e) => return error_response(&e).into_response(),
        },
        None => None,
    };

    let mut builder = FrameBuilder::new(stream_id).prior(prior);
    if let Some(t) = request.logical_time {
        builder = builder.logical_time(t);
    }
    let frame = builder.build(&request.text);

    (StatusCode::OK, Json(ExtractResponse { ok: true, frame })).into_response()
}

// =============================================================================
// STREAM HANDLER
// =============================================================================

/// Latest committed digest of a stream.
pub async fn stream_handler(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> Response {
    match state.service.latest(&stream_id) {
        Ok(Some(digest)) => (
            StatusCode::OK,
            Json(StreamResponse {
                ok: true,
                stream_id,
                digest,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "stream_not_found",
                format!("No accepted frame on stream '{}'", stream_id),
            )),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// =============================================================================
// SCHEMA HANDLER
// =============================================================================

fn schema_bundle() -> Result<(String, Value), OpenlineError> {
    let schema = frame_schema()?;
    Ok((schema_hash()?, schema))
}

/// JSON Schema bundle for the wire shapes.
pub async fn schema_handler() -> Response {
    match schema_bundle() {
        Ok((hash, schema)) => (
            StatusCode::OK,
            Json(SchemaResponse {
                ok: true,
                hash,
                schema,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_409() {
        let (status, body) = error_response(&OpenlineError::StreamConflict("s".to_string()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code.as_deref(), Some("stream_conflict"));
    }
}
