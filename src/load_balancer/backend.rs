//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server and its traffic share
//! - Hold the ordered, immutable set of backends shared by all connections

use std::fmt;
use std::sync::Arc;

use axum::http::Uri;
use url::Url;

use crate::config::{validation::check_backend_address, BackendConfig, ConfigError};
use crate::load_balancer::weights::normalize_weights;
use crate::proxy::error::{ProxyError, ProxyResult};

/// A single backend server.
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    /// Base URL of the backend (scheme, host, port and optional base path).
    pub address: Url,
    /// Weight as configured.
    pub raw_weight: f64,
    /// Share of traffic in percent, rounded to 2 decimal places.
    pub weight: f64,
}

impl Backend {
    /// Base URL without the trailing slash, ready for path concatenation.
    pub fn base(&self) -> &str {
        self.address.as_str().trim_end_matches('/')
    }

    /// Outbound URI for a request path.
    ///
    /// Scheme and authority always come from the backend address; `path` only
    /// extends the backend's base path, so it can never change the host dialed.
    /// Targets not starting with `/` are refused.
    pub fn target(&self, path: &str) -> ProxyResult<Uri> {
        if !path.starts_with('/') {
            return Err(ProxyError::MalformedRequest(format!(
                "request target {path:?} must start with '/'"
            )));
        }
        let host = self
            .address
            .host_str()
            .ok_or_else(|| ProxyError::MalformedRequest(format!("backend {self} has no host")))?;
        let authority = match self.address.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path_and_query = format!("{}{}", self.address.path().trim_end_matches('/'), path);

        Uri::builder()
            .scheme(self.address.scheme())
            .authority(authority.as_str())
            .path_and_query(path_and_query.as_str())
            .build()
            .map_err(|e| ProxyError::MalformedRequest(format!("invalid request target {path:?}: {e}")))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base())
    }
}

/// Ordered, non-empty collection of backends.
///
/// Order matters: the first backend owns the first slice of the `[0, 100)`
/// selection range. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct BackendSet {
    backends: Vec<Arc<Backend>>,
    /// Index returned when a draw falls past the cumulative sum.
    fallback: usize,
}

impl BackendSet {
    /// Build a set from already normalized backends.
    pub fn new(backends: Vec<Backend>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::Weights("no backends configured".into()));
        }
        let fallback = backends
            .iter()
            .rposition(|b| b.weight > 0.0)
            .unwrap_or(backends.len() - 1);
        Ok(Self {
            backends: backends.into_iter().map(Arc::new).collect(),
            fallback,
        })
    }

    /// Parse addresses and normalize weights from configuration.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, ConfigError> {
        let entries = configs
            .iter()
            .map(|c| {
                check_backend_address(&c.address)
                    .map(|url| (url, c.weight))
                    .map_err(ConfigError::Weights)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(normalize_weights(entries)?)
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend used when rounding leaves a draw unmatched.
    ///
    /// This is the last backend with a positive weight, not simply the last
    /// backend: when trailing backends have weight 0 they are passed over,
    /// so a zero-weight backend never receives traffic. Only when every
    /// weight is 0 (which normalization rejects) would it be the last entry.
    pub fn fallback(&self) -> &Arc<Backend> {
        &self.backends[self.fallback]
    }
}
