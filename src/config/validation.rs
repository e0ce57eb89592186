//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and the env overlay handle syntax)
//! - Require a counter store URL and check its shape
//! - Validate value ranges (quota, window and timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatekeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatekeeperConfig;
use crate::ratelimit::MEMORY_SCHEME;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be greater than 0"));
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }
    for path in &config.rate_limit.exempt_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "rate_limit.exempt_paths",
                format!("{path:?} must start with '/'"),
            ));
        }
    }

    match config.store.url.as_deref() {
        None | Some("") => errors.push(ValidationError::new("store.url", "is required (set REDIS_URL)")),
        Some(url) => {
            if let Err(message) = check_store_url(url) {
                errors.push(ValidationError::new("store.url", message));
            }
        }
    }
    if config.store.timeout_ms == 0 {
        errors.push(ValidationError::new("store.timeout_ms", "must be greater than 0"));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("{addr:?} is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `redis://` with a host, `redis+unix://` with a path, and
/// `memory://`. `rediss://` is refused: the Redis client is built without TLS.
fn check_store_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("malformed URL: {e}"))?;

    match url.scheme() {
        "rediss" => {
            Err("TLS (rediss://) is not supported; use redis:// or a unix socket".to_string())
        }
        "redis" => {
            if url.host_str().map_or(true, str::is_empty) {
                return Err("missing host".to_string());
            }
            let db = url.path().trim_start_matches('/');
            if !db.is_empty() && db.parse::<u32>().is_err() {
                return Err(format!("database {db:?} is not a number"));
            }
            Ok(())
        }
        "redis+unix" | "unix" => {
            if url.path().is_empty() {
                return Err("missing socket path".to_string());
            }
            Ok(())
        }
        scheme if scheme == MEMORY_SCHEME => Ok(()),
        other => Err(format!("unsupported scheme {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatekeeperConfig {
        let mut config = GatekeeperConfig::default();
        config.store.url = Some("redis://127.0.0.1:6379".to_string());
        config
    }

    fn fields(config: &GatekeeperConfig) -> Vec<&'static str> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_default_with_url_is_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_store_url() {
        let config = GatekeeperConfig::default();
        assert_eq!(fields(&config), vec!["store.url"]);
    }

    #[test]
    fn test_store_url_shapes() {
        for ok in [
            "redis://localhost",
            "redis://:pw@cache:6380/3",
            "redis+unix:///var/run/redis.sock",
            "memory://",
        ] {
            assert_eq!(check_store_url(ok), Ok(()), "{ok}");
        }
        for bad in [
            "rediss://user:pw@cache.example.com:6380",
            "localhost:6379",
            "http://cache:6379",
            "redis://cache:6379/zero",
            "redis://",
        ] {
            assert!(check_store_url(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_tls_url_names_the_problem() {
        let mut config = valid();
        config.store.url = Some("rediss://cache.example.com:6380".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "store.url");
        assert!(errors[0].message.contains("TLS"), "{}", errors[0].message);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.rate_limit.exempt_paths = vec!["health".to_string()];
        config.listener.bind_address = "nowhere".to_string();
        config.observability.metrics_address = Some("9090".to_string());

        assert_eq!(
            fields(&config),
            vec![
                "listener.bind_address",
                "rate_limit.max_requests",
                "rate_limit.window_secs",
                "rate_limit.exempt_paths",
                "observability.metrics_address",
            ]
        );
    }
}
