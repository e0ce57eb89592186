//! Gatekeeper responses.
//!
//! # Responsibilities
//! - Health report for `GET /health`
//! - 429 rejection with `Retry-After` when the quota is exhausted
//! - 503 when the counter store is down and the policy is fail-closed
//! - Quota headers on every rate-limited response

use std::time::Duration;

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ratelimit::Usage;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded.";
pub const LIMITER_UNAVAILABLE: &str = "Rate limiter unavailable.";

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

/// Error body for responses produced by the gatekeeper itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub async fn health() -> Json<HealthCheck> {
    Json(HealthCheck::default())
}

/// 429 response for an exhausted quota.
pub fn rate_limited(usage: &Usage) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody::new(RATE_LIMIT_EXCEEDED)),
    )
        .into_response();

    let headers = response.headers_mut();
    apply_quota_headers(headers, usage);
    if let Some(ttl) = usage.ttl {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(ttl)));
    }
    response
}

/// 503 response for an unreachable counter store.
pub fn limiter_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody::new(LIMITER_UNAVAILABLE)),
    )
        .into_response()
}

/// Add `X-RateLimit-Limit` and, when known, `X-RateLimit-Remaining`.
pub fn apply_quota_headers(headers: &mut HeaderMap, usage: &Usage) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(usage.limit));
    if let Some(remaining) = usage.remaining() {
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    }
}

/// Whole seconds until expiry, rounded up, at least 1.
fn retry_after_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
