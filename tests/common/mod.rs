//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Extension, Router};
use tokio::net::TcpListener;

use request_gatekeeper::config::GatekeeperConfig;
use request_gatekeeper::ratelimit::{Consumption, CounterRecord, CounterStore, StoreError};
use request_gatekeeper::{ClientIdentity, GatekeeperServer, Shutdown};

/// A gatekeeper running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with an in-memory store and the given quota.
pub fn config(max_requests: u64, window_secs: u64) -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.store.url = Some("memory://".to_string());
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = window_secs;
    config
}

/// Downstream application: echoes the identity the gatekeeper resolved.
pub fn app() -> Router {
    Router::new().route("/", get(whoami)).route("/whoami", get(whoami))
}

async fn whoami(Extension(identity): Extension<ClientIdentity>) -> String {
    identity.to_string()
}

/// Start a gatekeeper in front of [`app`].
pub async fn spawn_gatekeeper(config: GatekeeperConfig, store: Arc<dyn CounterStore>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatekeeperServer::with_routes(config, store, app());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestServer {
        addr,
        client,
        shutdown,
    }
}

/// A store whose every operation fails as if the server were down.
pub struct UnreachableStore;

#[async_trait]
impl CounterStore for UnreachableStore {
    async fn try_consume(&self, _: &str, _: u64, _: Duration) -> Result<Consumption, StoreError> {
        Err(StoreError::Unreachable("connection refused".into()))
    }

    async fn current(&self, _: &str) -> Result<Option<CounterRecord>, StoreError> {
        Err(StoreError::Unreachable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unreachable("connection refused".into()))
    }

    fn backend(&self) -> &'static str {
        "unreachable"
    }
}
