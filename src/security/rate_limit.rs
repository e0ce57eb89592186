//! Rate limiting middleware.
//!
//! Runs in front of every handler, including the 404 fallback. Exempt paths
//! skip identity resolution and the store entirely.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::config::GatekeeperConfig;
use crate::http::request::RequestIdExt;
use crate::http::response;
use crate::ratelimit::{Decision, RateLimiter};
use crate::security::identity::IdentityResolver;

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    resolver: Arc<IdentityResolver>,
    limiter: Arc<RateLimiter>,
    exempt_paths: Arc<[String]>,
}

impl RateLimitState {
    pub fn new(config: &GatekeeperConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            resolver: Arc::new(IdentityResolver::new(config)),
            limiter,
            exempt_paths: config.rate_limit.exempt_paths.clone().into(),
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }
}

/// Middleware function for per-identity rate limiting.
///
/// On admission the resolved [`ClientIdentity`](crate::security::identity::ClientIdentity)
/// is stored in the request extensions for downstream handlers.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<RateLimitState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if state.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let identity = state.resolver.resolve(request.headers(), addr);

    match state.limiter.admit(&identity).await {
        Ok(Decision::Allow(usage)) => {
            request.extensions_mut().insert(identity);
            let mut response = next.run(request).await;
            response::apply_quota_headers(response.headers_mut(), &usage);
            response
        }
        Ok(Decision::Reject(usage)) => {
            tracing::debug!(
                client = %identity,
                request_id = request.request_id().unwrap_or("unknown"),
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            response::rate_limited(&usage)
        }
        Err(_) => response::limiter_unavailable(),
    }
}
