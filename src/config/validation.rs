//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required management plane inputs are present
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: required value is missing")]
    Missing { field: &'static str },

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::invalid(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::invalid(
            "listener.max_concurrent_requests",
            "must be greater than zero",
        ));
    }

    let mgmt = &config.management;
    if mgmt.endpoint_url.trim().is_empty() {
        errors.push(ValidationError::Missing {
            field: "management.endpoint_url",
        });
    } else {
        match Url::parse(&mgmt.endpoint_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::invalid(
                "management.endpoint_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::invalid(
                "management.endpoint_url",
                e.to_string(),
            )),
        }
    }
    if mgmt.token.trim().is_empty() {
        errors.push(ValidationError::Missing {
            field: "management.token",
        });
    }
    if mgmt.sync_interval_ms == 0 {
        errors.push(ValidationError::invalid(
            "management.sync_interval_ms",
            "must be greater than zero",
        ));
    }
    if mgmt.retry_interval_ms == 0 {
        errors.push(ValidationError::invalid(
            "management.retry_interval_ms",
            "must be greater than zero",
        ));
    }
    if mgmt.max_retry_count == 0 {
        errors.push(ValidationError::invalid(
            "management.max_retry_count",
            "must be at least 1",
        ));
    }
    if mgmt.max_backoff_ms < mgmt.retry_interval_ms {
        errors.push(ValidationError::invalid(
            "management.max_backoff_ms",
            "must not be smaller than retry_interval_ms",
        ));
    }
    if mgmt.fetch_timeout_ms == Some(0) {
        errors.push(ValidationError::invalid(
            "management.fetch_timeout_ms",
            "must be greater than zero",
        ));
    }

    if config.cache.enabled && config.cache.directory.as_os_str().is_empty() {
        errors.push(ValidationError::Missing {
            field: "cache.directory",
        });
    }

    if HeaderName::from_bytes(config.auth.header.as_bytes()).is_err() {
        errors.push(ValidationError::invalid(
            "auth.header",
            format!("'{}' is not a valid header name", config.auth.header),
        ));
    }

    let probes = &config.probes;
    for (field, path) in [
        ("probes.liveness_path", &probes.liveness_path),
        ("probes.readiness_path", &probes.readiness_path),
    ] {
        if !path.starts_with('/') || path.len() < 2 {
            errors.push(ValidationError::invalid(
                field,
                "must be an absolute path other than '/'",
            ));
        } else if path.contains(['{', '}', '*', ':']) {
            errors.push(ValidationError::invalid(
                field,
                "must be a literal path without route parameters",
            ));
        }
    }
    if probes.liveness_path == probes.readiness_path {
        errors.push(ValidationError::invalid(
            "probes.readiness_path",
            "must differ from liveness_path",
        ));
    }

    if config.timeouts.backend_secs == 0 {
        errors.push(ValidationError::invalid(
            "timeouts.backend_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::invalid(
            "timeouts.connect_secs",
            "must be greater than zero",
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::invalid(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    let admin = &config.admin;
    if admin.enabled {
        if admin.api_key.trim().is_empty() {
            errors.push(ValidationError::Missing {
                field: "admin.api_key",
            });
        }
        if admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::invalid(
                "admin.bind_address",
                format!("'{}' is not a socket address", admin.bind_address),
            ));
        }
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

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.management.endpoint_url = "http://mgmt.internal/config".into();
        config.management.token = "secret".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_management_inputs() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::Missing {
            field: "management.endpoint_url"
        }));
        assert!(errors.contains(&ValidationError::Missing {
            field: "management.token"
        }));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-address".into();
        config.management.max_retry_count = 0;
        config.probes.readiness_path = config.probes.liveness_path.clone();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "{:?}", errors);
    }

    #[test]
    fn test_backoff_must_cover_retry_interval() {
        let mut config = valid_config();
        config.management.retry_interval_ms = 10_000;
        config.management.max_backoff_ms = 1_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_admin_requires_key_when_enabled() {
        let mut config = valid_config();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Missing { field: "admin.api_key" }]);
    }
}
