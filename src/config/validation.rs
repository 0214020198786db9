//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (budgets > 0, addresses parse)
//! - Check that inner budgets fit inside the request budget
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid upstream url '{0}'")]
    UpstreamUrl(String),

    #[error("upstream pair_key must not be empty")]
    EmptyPairKey,

    #[error("storage path must not be empty")]
    EmptyStoragePath,

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeout '{name}' ({value_ms}ms) exceeds request_ms ({request_ms}ms)")]
    ExceedsRequest {
        name: &'static str,
        value_ms: u64,
        request_ms: u64,
    },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a server configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match reqwest::Url::parse(&config.upstream.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::UpstreamUrl(config.upstream.url.clone())),
    }

    if config.upstream.pair_key.trim().is_empty() {
        errors.push(ValidationError::EmptyPairKey);
    }

    if config.storage.path.trim().is_empty() {
        errors.push(ValidationError::EmptyStoragePath);
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("request_ms", timeouts.request_ms),
        ("fetch_ms", timeouts.fetch_ms),
        ("persist_ms", timeouts.persist_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    for (name, value) in [("fetch_ms", timeouts.fetch_ms), ("persist_ms", timeouts.persist_ms)] {
        if value > timeouts.request_ms {
            errors.push(ValidationError::ExceedsRequest {
                name,
                value_ms: value,
                request_ms: timeouts.request_ms,
            });
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.url = "ftp://example.com".into();
        config.upstream.pair_key = " ".into();
        config.timeouts.persist_ms = 0;

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::UpstreamUrl("ftp://example.com".into())));
        assert!(errors.contains(&ValidationError::EmptyPairKey));
        assert!(errors.contains(&ValidationError::ZeroTimeout("persist_ms")));
    }

    #[test]
    fn test_inner_budget_must_fit_request() {
        let mut config = ServerConfig::default();
        config.timeouts.request_ms = 100;
        config.timeouts.fetch_ms = 200;

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(
            errors,
            vec![ValidationError::ExceedsRequest {
                name: "fetch_ms",
                value_ms: 200,
                request_ms: 100,
            }]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
