//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the health endpoint and application routes
//! - Wire up middleware (CORS, request ID, tracing, timeout, rate limiting)
//! - Serve with peer addresses available to the rate limiter
//! - Stop on the shutdown signal
//!
//! # Layer order (outermost first)
//! ```text
//! CorsLayer → SetRequestId → PropagateRequestId → TraceLayer → Timeout
//!     → rate_limit_middleware → handlers
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatekeeperConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response;
use crate::ratelimit::{CounterStore, RateLimiter};
use crate::security::rate_limit::{rate_limit_middleware, RateLimitState};

/// HTTP server for the gatekeeper.
pub struct GatekeeperServer {
    router: Router,
    config: GatekeeperConfig,
}

impl GatekeeperServer {
    /// Create a server exposing only `/health` behind the gatekeeper.
    pub fn new(config: GatekeeperConfig, store: Arc<dyn CounterStore>) -> Self {
        Self::with_routes(config, store, Router::new())
    }

    /// Create a server protecting the given application routes.
    pub fn with_routes(config: GatekeeperConfig, store: Arc<dyn CounterStore>, app: Router) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config, store));
        let state = RateLimitState::new(&config, limiter);
        let router = Self::build_router(&config, app, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, app: Router, state: RateLimitState) -> Router {
        app.route("/health", get(response::health))
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = request.request_id().unwrap_or("unknown"),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(cors_layer())
    }

    /// The assembled router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_requests = self.config.rate_limit.max_requests,
            window_secs = self.config.rate_limit.window_secs,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every origin, method and header, with credentials.
///
/// Wildcards cannot be combined with credentials, so the request's own values
/// are mirrored back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::ratelimit::MemoryStore;

    fn server(max_requests: u64) -> GatekeeperServer {
        let mut config = GatekeeperConfig::default();
        config.store.url = Some("memory://".to_string());
        config.rate_limit.max_requests = max_requests;
        let app = Router::new().route("/", get(|| async { "hello" }));
        GatekeeperServer::with_routes(config, Arc::new(MemoryStore::new()), app)
    }

    fn router(server: &GatekeeperServer, peer: [u8; 4]) -> Router {
        server
            .router()
            .layer(MockConnectInfo(SocketAddr::from((peer, 40000))))
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_router_limits_per_peer() {
        let server = server(1);

        let first = router(&server, [10, 0, 0, 1]).oneshot(get_request("/")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router(&server, [10, 0, 0, 1]).oneshot(get_request("/")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = router(&server, [10, 0, 0, 2]).oneshot(get_request("/")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_body() {
        let server = server(1);
        let response = router(&server, [10, 0, 0, 1])
            .oneshot(get_request("/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"status":"OK"}"#);
    }
}
