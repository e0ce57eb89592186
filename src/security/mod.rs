//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (skip exempt paths)
//!     → identity.rs (who is this? trusted-proxy aware)
//!     → ratelimit::RateLimiter (admit / reject / store down)
//!     → Pass to application handlers
//! ```
//!
//! # Design Decisions
//! - Forwarding headers are only as trustworthy as the configured proxy list
//! - Rejection is a normal response (429), never an error
//! - Store outages follow the configured failure policy (default: fail closed)

pub mod identity;
pub mod rate_limit;
