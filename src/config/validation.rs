//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, weights >= 0)
//! - Check backend addresses are plain `http` URLs with a host
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Weight sum checks belong to the normalizer, which runs on every startup path

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `backends[1].weight`).
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::new("backends", "at least one backend is required"));
    }
    for (i, backend) in config.backends.iter().enumerate() {
        if let Err(message) = check_backend_address(&backend.address) {
            errors.push(ValidationError::new(format!("backends[{i}].address"), message));
        }
        if !backend.weight.is_finite() || backend.weight < 0.0 {
            errors.push(ValidationError::new(
                format!("backends[{i}].weight"),
                format!("{} is not a non-negative number", backend.weight),
            ));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.limits.max_header_bytes == 0 {
        errors.push(ValidationError::new("limits.max_header_bytes", "must be greater than 0"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected one of {:?}", LOG_FORMATS),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Backends are reached over plain HTTP; TLS to backends is not supported.
pub(crate) fn check_backend_address(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| format!("'{address}' is not a URL: {e}"))?;
    if url.scheme() != "http" {
        return Err(format!("'{address}' must use the http scheme"));
    }
    if url.host_str().is_none() {
        return Err(format!("'{address}' has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{address}' must not carry a query or fragment"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;

    fn backend(address: &str, weight: f64) -> BackendConfig {
        BackendConfig {
            address: address.to_string(),
            weight,
        }
    }

    #[test]
    fn default_config_needs_backends() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "backends");
    }

    #[test]
    fn valid_config_passes() {
        let mut config = ProxyConfig::default();
        config.backends.push(backend("http://127.0.0.1:9001", 70.0));
        config.backends.push(backend("http://localhost:9002/api", 30.0));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.listener.max_connections = 0;
        config.backends.push(backend("https://secure.example:443", 1.0));
        config.backends.push(backend("http://127.0.0.1:9002", -5.0));
        config.backends.push(backend("::bad::", f64::NAN));
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "listener.max_connections",
                "backends[0].address",
                "backends[1].weight",
                "backends[2].address",
                "backends[2].weight",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn rejects_query_in_backend_address() {
        assert!(check_backend_address("http://127.0.0.1:9001/?a=b").is_err());
        assert!(check_backend_address("http://127.0.0.1:9001").is_ok());
    }
}
