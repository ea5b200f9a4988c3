//! Weighted Reverse Proxy
//!
//! Accepts HTTP/1.x connections, picks a backend by configured traffic share,
//! forwards the request and relays the response.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                   WEIGHTED PROXY                      │
//!     Client Request      │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!     ────────────────────┼─▶│   net    │──▶│   http     │──▶│ load_balancer │   │
//!                         │  │ listener │   │  request   │   │   weighted    │   │
//!                         │  └──────────┘   └────────────┘   └───────┬───────┘   │
//!                         │                                          ▼           │
//!     Client Response     │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!     ◀───────────────────┼──│   net    │◀──│   http     │◀──│    proxy      │◀──┼── Backend
//!                         │  │connection│   │  response  │   │  forwarder    │   │
//!                         │  └──────────┘   └────────────┘   └───────────────┘   │
//!                         │                                                      │
//!                         │   config · observability · lifecycle                 │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use wrr_proxy::config::{self, BackendConfig, ProxyConfig};
use wrr_proxy::lifecycle::{trigger_on_ctrl_c, Shutdown};
use wrr_proxy::net::Listener;
use wrr_proxy::observability::init_logging;
use wrr_proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "wrr-proxy")]
#[command(about = "Weighted round-robin HTTP reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the port of `listener.bind_address`).
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend as URL=WEIGHT (weight defaults to 1). Repeatable; appended to the file's backends.
    #[arg(short, long = "backend", value_name = "URL=WEIGHT", value_parser = parse_backend)]
    backends: Vec<BackendConfig>,

    /// Maximum concurrently handled connections.
    #[arg(long)]
    max_connections: Option<usize>,
}

fn parse_backend(arg: &str) -> Result<BackendConfig, String> {
    let (address, weight) = match arg.rsplit_once('=') {
        Some((address, weight)) => {
            let weight = weight
                .parse::<f64>()
                .map_err(|_| format!("invalid weight '{weight}' in '{arg}'"))?;
            (address, weight)
        }
        None => (arg, 1.0),
    };
    Ok(BackendConfig {
        address: address.to_string(),
        weight,
    })
}

/// Merge CLI flags into the file configuration and validate the result.
fn build_config(cli: Cli) -> Result<ProxyConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(port) = cli.port {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }
    if let Some(max_connections) = cli.max_connections {
        config.listener.max_connections = max_connections;
    }
    config.backends.extend(cli.backends);

    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(cli)?;

    init_logging(&config.observability);
    tracing::info!("wrr-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        backends = config.backends.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Weights are normalized before the listener opens.
    let server = ProxyServer::new(&config)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::select! {
        result = server.run(listener, server_shutdown) => result?,
        _ = trigger_on_ctrl_c(&shutdown) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_flags() {
        assert_eq!(
            parse_backend("http://127.0.0.1:9001=70").unwrap(),
            BackendConfig {
                address: "http://127.0.0.1:9001".into(),
                weight: 70.0
            }
        );
        assert_eq!(parse_backend("http://10.0.0.1:80").unwrap().weight, 1.0);
        assert!(parse_backend("http://10.0.0.1:80=heavy").is_err());
    }

    #[test]
    fn cli_overrides_port_and_adds_backends() {
        let cli = Cli::parse_from([
            "wrr-proxy",
            "--port",
            "9999",
            "--backend",
            "http://127.0.0.1:9001=3",
            "-b",
            "http://127.0.0.1:9002=1",
            "--max-connections",
            "16",
        ]);
        let config = build_config(cli).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
        assert_eq!(config.listener.max_connections, 16);
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].weight, 3.0);
    }

    #[test]
    fn missing_backends_fail_validation() {
        let cli = Cli::parse_from(["wrr-proxy"]);
        assert!(matches!(build_config(cli), Err(config::ConfigError::Validation(_))));
    }
}
