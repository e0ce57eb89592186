//! Configuration loading from disk and the process environment.
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `RATE_LIMIT` | `20` | `rate_limit.max_requests` |
//! | `EXPIRY_TIME` | `120` | `rate_limit.window_secs` |
//! | `REDIS_URL` | required | `store.url` |
//! | `RATE_LIMIT_KEY_PREFIX` | `rate_limit:` | `rate_limit.key_prefix` |
//! | `RATE_LIMIT_EXEMPT_PATHS` | `/health` | `rate_limit.exempt_paths` |
//! | `STORE_TIMEOUT_MS` | `500` | `store.timeout_ms` |
//! | `STORE_FAILURE_POLICY` | `closed` | `store.failure_policy` |
//! | `TRUSTED_PROXIES` | `*` | `identity.trusted_proxies` |
//! | `BIND_ADDRESS` | `0.0.0.0:8000` | `listener.bind_address` |
//! | `REQUEST_TIMEOUT_SECS` | `30` | `listener.request_timeout_secs` |
//! | `LOG_LEVEL` | `info` | `observability.log_level` |
//! | `LOG_FORMAT` | `pretty` | `observability.log_format` |
//! | `METRICS_ADDRESS` | unset | `observability.metrics_address` |
//!
//! Environment variables override values from the TOML file.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatekeeperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", ValidationErrors(.0))]
    Validation(Vec<ValidationError>),
}

struct ValidationErrors<'a>(&'a [ValidationError]);

impl fmt::Display for ValidationErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Load, overlay the process environment, and validate.
pub fn load_config(path: Option<&Path>) -> Result<GatekeeperConfig, ConfigError> {
    load_with(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<GatekeeperConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => from_file(path)?,
        None => GatekeeperConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn from_file(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
pub fn apply_env<F>(config: &mut GatekeeperConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env(lookup);

    if let Some(v) = env.parsed("RATE_LIMIT")? {
        config.rate_limit.max_requests = v;
    }
    if let Some(v) = env.parsed("EXPIRY_TIME")? {
        config.rate_limit.window_secs = v;
    }
    if let Some(v) = env.raw("REDIS_URL") {
        config.store.url = Some(v);
    }
    if let Some(v) = env.raw("RATE_LIMIT_KEY_PREFIX") {
        config.rate_limit.key_prefix = v;
    }
    if let Some(v) = env.raw("RATE_LIMIT_EXEMPT_PATHS") {
        config.rate_limit.exempt_paths = v
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = env.parsed("STORE_TIMEOUT_MS")? {
        config.store.timeout_ms = v;
    }
    if let Some(v) = env.parsed("STORE_FAILURE_POLICY")? {
        config.store.failure_policy = v;
    }
    if let Some(v) = env.parsed("TRUSTED_PROXIES")? {
        config.identity.trusted_proxies = v;
    }
    if let Some(v) = env.raw("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = env.parsed("REQUEST_TIMEOUT_SECS")? {
        config.listener.request_timeout_secs = v;
    }
    if let Some(v) = env.raw("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = env.parsed("LOG_FORMAT")? {
        config.observability.log_format = v;
    }
    if let Some(v) = env.raw("METRICS_ADDRESS") {
        config.observability.metrics_address = Some(v).filter(|a| !a.is_empty());
    }

    Ok(())
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, var: &str) -> Option<String> {
        (self.0)(var)
    }

    fn parsed<T>(&self, var: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.raw(var) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidEnv {
                    var,
                    reason: e.to_string(),
                    value,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailurePolicy, LogFormat, TrustedProxies};
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_with_only_redis_url() {
        let config = load_with(None, lookup(&[("REDIS_URL", "redis://localhost:6379")])).unwrap();
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_secs, 120);
        assert_eq!(config.store.url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_missing_redis_url_is_fatal() {
        let err = load_with(None, lookup(&[])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "store.url"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_env_overrides() {
        let config = load_with(
            None,
            lookup(&[
                ("REDIS_URL", "redis://cache:6379/2"),
                ("RATE_LIMIT", "3"),
                ("EXPIRY_TIME", "60"),
                ("STORE_FAILURE_POLICY", "open"),
                ("TRUSTED_PROXIES", "10.0.0.1,10.0.0.2"),
                ("RATE_LIMIT_EXEMPT_PATHS", ""),
                ("LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.store.failure_policy, FailurePolicy::Open);
        assert!(matches!(config.identity.trusted_proxies, TrustedProxies::Only(ref a) if a.len() == 2));
        assert!(config.rate_limit.exempt_paths.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_number_names_the_variable() {
        let err = load_with(
            None,
            lookup(&[("REDIS_URL", "redis://localhost"), ("RATE_LIMIT", "lots")]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnv { var: "RATE_LIMIT", .. }));
        assert!(err.to_string().contains("RATE_LIMIT=\"lots\""));
    }

    #[test]
    fn test_env_wins_over_file() {
        let path = std::env::temp_dir().join(format!("gatekeeper-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[rate_limit]\nmax_requests = 7\nwindow_secs = 30\n\n[store]\nurl = \"memory://\""
        )
        .unwrap();

        let config = load_with(Some(&path), lookup(&[("RATE_LIMIT", "9")])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limit.max_requests, 9);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.store.url.as_deref(), Some("memory://"));
    }

    #[test]
    fn test_validation_message_lists_all_errors() {
        let err = load_with(
            None,
            lookup(&[("REDIS_URL", "ftp://x"), ("RATE_LIMIT", "0")]),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("rate_limit.max_requests"));
        assert!(message.contains("store.url"));
    }
}
