//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overlay: RATE_LIMIT, EXPIRY_TIME, REDIS_URL, ...)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → passed by reference into the resolver and limiter constructors
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never changes afterwards
//! - All fields but the store URL have defaults to allow minimal configs
//! - Validation separates syntactic (serde, env parsing) from semantic checks
//! - Any configuration error is fatal: the process never starts serving

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    FailurePolicy, GatekeeperConfig, IdentityConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, StoreConfig, TrustedProxies,
};
pub use validation::ValidationError;
