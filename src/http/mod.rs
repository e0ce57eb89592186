//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address captured)
//!     → server.rs (Axum setup, CORS, tracing, timeout)
//!     → request.rs (request ID assigned and propagated)
//!     → security::rate_limit (gatekeeper decision)
//!     → application handlers, or response.rs (429 / 503)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::GatekeeperServer;
