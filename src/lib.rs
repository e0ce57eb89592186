//! HTTP request gatekeeper.
//!
//! Every inbound request is attributed to a client identity and checked
//! against a per-client quota over a time window held in a shared counter
//! store (Redis). Requests within quota pass through; the rest get a 429.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod ratelimit;
pub mod security;

pub use config::schema::GatekeeperConfig;
pub use error::{GatekeeperError, Result};
pub use http::GatekeeperServer;
pub use lifecycle::Shutdown;
pub use ratelimit::{Decision, RateLimiter};
pub use security::identity::{ClientIdentity, IdentityResolver};
