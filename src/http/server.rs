//! Proxy server setup and accept loop.
//!
//! # Responsibilities
//! - Build the shared, read-only handler context from configuration
//! - Run the accept loop on a bounded listener
//! - Spawn one task per connection running the `ConnectionHandler`
//! - Stop accepting on shutdown signal or fatal accept error

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{ConfigError, ProxyConfig};
use crate::http::request::RequestLimits;
use crate::load_balancer::{BackendSet, WeightedSelector};
use crate::net::{Accepted, ConnectionHandler, HandlerContext, Listener, ListenerError};
use crate::observability::{AccessLog, TracingAccessLog};
use crate::proxy::{HyperTransport, ProxyForwarder, Transport};

/// Weighted reverse proxy server.
pub struct ProxyServer<T> {
    context: HandlerContext<T>,
}

impl ProxyServer<HyperTransport> {
    /// Create a server from validated configuration.
    ///
    /// Normalizes backend weights; fails if they cannot be normalized.
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let backends = BackendSet::from_config(&config.backends)?;
        for backend in backends.backends() {
            tracing::info!(
                backend = %backend,
                raw_weight = backend.raw_weight,
                weight = backend.weight,
                "Backend configured"
            );
        }

        let transport = HyperTransport::new(&config.timeouts);
        Ok(Self::with_transport(
            backends,
            transport,
            Arc::new(TracingAccessLog),
            RequestLimits::from(&config.limits),
        ))
    }
}

impl<T: Transport> ProxyServer<T> {
    /// Assemble a server from its parts.
    pub fn with_transport(
        backends: BackendSet,
        transport: T,
        access_log: Arc<dyn AccessLog>,
        limits: RequestLimits,
    ) -> Self {
        Self {
            context: HandlerContext {
                backends: Arc::new(backends),
                selector: WeightedSelector::new(),
                forwarder: Arc::new(ProxyForwarder::new(transport, access_log)),
                limits,
            },
        }
    }

    pub fn backends(&self) -> &BackendSet {
        &self.context.backends
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns `Ok(())` on shutdown. An accept failure ends the loop with an error.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            backends = self.context.backends.len(),
            "Proxy server starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Accepted { stream, peer, permit } = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::error!(error = %e, "Accept loop failed, stopping server");
                            return Err(e);
                        }
                    };

                    let handler = ConnectionHandler::new(self.context.clone(), Some(peer));
                    tracing::debug!(connection_id = %handler.id(), peer_addr = %peer, "Dispatching connection");
                    tokio::spawn(async move {
                        handler.handle(stream).await;
                        drop(permit);
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}
