//! Client identity resolution.
//!
//! # Responsibilities
//! - Attribute each request to a client identity string
//! - Honor `X-Forwarded-For` / `X-Real-IP` only from trusted proxies
//!
//! # Precedence
//! ```text
//! peer trusted && X-Forwarded-For  → first entry, trimmed
//! peer trusted && X-Real-IP        → literal value
//! otherwise                        → peer IP
//! ```
//!
//! Header values are not checked for address syntax.

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::config::{GatekeeperConfig, TrustedProxies};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Who is making a request. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClientIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Derives a [`ClientIdentity`] from request metadata.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    trusted: TrustedProxies,
}

impl IdentityResolver {
    pub fn new(config: &GatekeeperConfig) -> Self {
        Self {
            trusted: config.identity.trusted_proxies.clone(),
        }
    }

    /// Resolve the identity for a request from `peer`. Never fails.
    pub fn resolve(&self, headers: &HeaderMap, peer: SocketAddr) -> ClientIdentity {
        if self.trusted.contains(&peer.ip()) {
            if let Some(forwarded) = first_forwarded(headers) {
                return ClientIdentity(forwarded);
            }
            if let Some(real_ip) = header_str(headers, X_REAL_IP) {
                return ClientIdentity(real_ip.to_string());
            }
        }

        ClientIdentity(peer.ip().to_string())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}

/// Leftmost `X-Forwarded-For` entry, i.e. the originating client.
fn first_forwarded(headers: &HeaderMap) -> Option<String> {
    header_str(headers, X_FORWARDED_FOR)?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
