//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files; the
//! environment overlay lives in `loader.rs`.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Quota and window.
    pub rate_limit: RateLimitConfig,

    /// Counter store connection and failure policy.
    pub store: StoreConfig,

    /// Client identity resolution.
    pub identity: IdentityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per identity per window.
    pub max_requests: u64,

    /// Window length in seconds; also the TTL of every counter record.
    pub window_secs: u64,

    /// Prefix prepended to the identity to form the counter key.
    pub key_prefix: String,

    /// Request paths that bypass the limiter entirely.
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_secs: 120,
            key_prefix: "rate_limit:".to_string(),
            exempt_paths: vec!["/health".to_string()],
        }
    }
}

/// Behavior when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Admit the request and log a warning.
    Open,
    /// Refuse the request with 503.
    #[default]
    Closed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(FailurePolicy::Open),
            "closed" => Ok(FailurePolicy::Closed),
            other => Err(format!("expected \"open\" or \"closed\", got {other:?}")),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Open => write!(f, "open"),
            FailurePolicy::Closed => write!(f, "closed"),
        }
    }
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `redis://[user:pass@]host:port[/db]`, or `memory://` for a
    /// process-local store. Required.
    pub url: Option<String>,

    /// Deadline for a single store operation in milliseconds.
    pub timeout_ms: u64,

    /// What to do when the store is unreachable or times out.
    pub failure_policy: FailurePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 500,
            failure_policy: FailurePolicy::Closed,
        }
    }
}

/// Peers allowed to set forwarding headers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum TrustedProxies {
    /// Every peer is trusted.
    #[default]
    Any,
    /// Only these peer addresses are trusted.
    Only(Vec<IpAddr>),
}

impl TrustedProxies {
    pub fn contains(&self, peer: &IpAddr) -> bool {
        match self {
            TrustedProxies::Any => true,
            TrustedProxies::Only(addrs) => addrs.contains(peer),
        }
    }
}

impl TryFrom<Vec<String>> for TrustedProxies {
    type Error = String;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        let entries: Vec<&str> = entries
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect();

        if entries.contains(&"*") {
            return Ok(TrustedProxies::Any);
        }

        entries
            .into_iter()
            .map(|e| {
                e.parse::<IpAddr>()
                    .map_err(|_| format!("{e:?} is not an IP address"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TrustedProxies::Only)
    }
}

impl From<TrustedProxies> for Vec<String> {
    fn from(value: TrustedProxies) -> Self {
        match value {
            TrustedProxies::Any => vec!["*".to_string()],
            TrustedProxies::Only(addrs) => addrs.iter().map(IpAddr::to_string).collect(),
        }
    }
}

impl FromStr for TrustedProxies {
    type Err = String;

    /// Comma-separated list, `*` for any.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrustedProxies::try_from(s.split(',').map(str::to_string).collect::<Vec<_>>())
    }
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub trusted_proxies: TrustedProxies,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"pretty\" or \"json\", got {other:?}")),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Prometheus exporter bind address; no exporter when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}
