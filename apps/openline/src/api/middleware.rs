//! # Middleware Module
//!
//! Per-endpoint rate limiting for the OpenLine HTTP API.
//!
//! Each route family (`frame`, `extract`, `streams`, `schema`, `health`) draws
//! from its own quota bucket, so a burst of extraction or polling traffic does
//! not starve frame submission. Rejections use the same `{"ok": false, ...}`
//! body as every other error, with `cap` set to the quota and a
//! `Retry-After` header in whole seconds.
//!
//! ## Configuration
//!
//! The quota comes from `[server] rate_limit` and can be overridden with
//! `OPENLINE_RATE_LIMIT` (requests per second per endpoint, 0 disables
//! limiting).

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter, clock::Clock};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Fallback quota when a zero rate reaches the limiter.
const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

/// Route families with their own bucket. Anything else shares `"other"`.
const ROUTE_BUCKETS: &[&str] = &["frame", "extract", "streams", "schema", "health"];

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Per-endpoint limiter shared by all requests.
#[derive(Clone)]
pub struct BusRateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<&'static str>>,
    rps: u32,
}

impl BusRateLimiter {
    /// Quota per endpoint, in requests per second.
    pub fn rps(&self) -> u32 {
        self.rps
    }

    /// Take one token from the bucket for `path`.
    ///
    /// On rejection, returns the wait until the next token in whole seconds
    /// (at least 1).
    pub fn check_path(&self, path: &str) -> Result<(), u64> {
        self.limiter.check_key(&route_bucket(path)).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.limiter.clock().now());
            wait.as_secs_f64().ceil().max(1.0) as u64
        })
    }
}

/// Create a limiter granting `requests_per_second` to each route family.
pub fn create_rate_limiter(requests_per_second: u32) -> BusRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    BusRateLimiter {
        limiter: Arc::new(RateLimiter::keyed(Quota::per_second(rps))),
        rps: rps.get(),
    }
}

/// Bucket for a request path: its first segment if it is a known route
/// family, otherwise `"other"`. Keys are static so the bucket map stays bounded.
pub fn route_bucket(path: &str) -> &'static str {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    ROUTE_BUCKETS
        .iter()
        .copied()
        .find(|bucket| *bucket == first)
        .unwrap_or("other")
}

/// Read `OPENLINE_RATE_LIMIT`, falling back to `default` when unset or
/// unparsable.
pub fn get_rate_limit_from_env(default: u32) -> u32 {
    std::env::var("OPENLINE_RATE_LIMIT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Rate limiting middleware.
///
/// Returns 429 with an `ErrorResponse` body when the route's bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<BusRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match limiter.check_path(&path) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let bucket = route_bucket(&path);
            tracing::warn!(bucket, retry_after, "rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse::rate_limited(bucket, limiter.rps())),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_uses_default_quota() {
        let limiter = create_rate_limiter(0);
        assert_eq!(limiter.rps(), 100);
        assert!(limiter.check_path("/frame").is_ok());
    }

    #[test]
    fn single_request_quota_exhausts_per_route() {
        let limiter = create_rate_limiter(1);
        assert!(limiter.check_path("/frame").is_ok());
        let retry = limiter.check_path("/frame").expect_err("exhausted");
        assert!(retry >= 1);

        // Other route families keep their own bucket.
        assert!(limiter.check_path("/extract").is_ok());
        assert!(limiter.check_path("/streams/a").is_ok());
    }

    #[test]
    fn streams_share_one_bucket() {
        let limiter = create_rate_limiter(1);
        assert!(limiter.check_path("/streams/a").is_ok());
        assert!(limiter.check_path("/streams/b").is_err());
    }

    #[test]
    fn route_buckets() {
        assert_eq!(route_bucket("/frame"), "frame");
        assert_eq!(route_bucket("/streams/s1"), "streams");
        assert_eq!(route_bucket("/"), "other");
        assert_eq!(route_bucket("/admin/x"), "other");
    }
}
