//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide the access-log capability injected into the forwarder
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Access records go through a trait object so tests can capture them

use std::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wrr_proxy={}", config.log_level.to_ascii_lowercase()).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// One forwarded request, as written to the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub backend: &'a str,
    pub status: u16,
}

impl fmt::Display for AccessRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {} {}", self.method, self.path, self.backend, self.status)
    }
}

/// Sink for access records.
pub trait AccessLog: Send + Sync {
    fn record(&self, entry: &AccessRecord<'_>);
}

/// Access log emitting one `info` event per request on target `wrr_proxy::access`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn record(&self, entry: &AccessRecord<'_>) {
        tracing::info!(
            target: "wrr_proxy::access",
            method = %entry.method,
            path = %entry.path,
            backend = %entry.backend,
            status = entry.status,
            "{entry}"
        );
    }
}
