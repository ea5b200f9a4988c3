//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Drive one connection: parse → select → forward → write → close
//! - Translate every per-connection failure into a `500` response
//!
//! # States
//! ```text
//! ReadingRequest → SelectingBackend → Forwarding → WritingResponse → Closed
//!        └───────────────┴────────────────┴──→ Error ──────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::http::request::{read_request, RequestLimits};
use crate::http::response::error_response;
use crate::load_balancer::{BackendSet, WeightedSelector};
use crate::proxy::{ProxyError, ProxyForwarder, Transport};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Parsing the inbound request.
    ReadingRequest,
    /// Picking a backend.
    SelectingBackend,
    /// Waiting on the backend.
    Forwarding,
    /// Writing the backend's response to the client.
    WritingResponse,
    /// Writing the `500` response.
    Error,
    /// Socket shut down. Terminal.
    Closed,
}

/// Everything a handler shares with its siblings. All of it is read-only.
pub struct HandlerContext<T> {
    pub backends: Arc<BackendSet>,
    pub selector: WeightedSelector,
    pub forwarder: Arc<ProxyForwarder<T>>,
    pub limits: RequestLimits,
}

impl<T> Clone for HandlerContext<T> {
    fn clone(&self) -> Self {
        Self {
            backends: Arc::clone(&self.backends),
            selector: self.selector,
            forwarder: Arc::clone(&self.forwarder),
            limits: self.limits,
        }
    }
}

/// Handles exactly one client connection.
pub struct ConnectionHandler<T> {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    context: HandlerContext<T>,
    state: ConnectionState,
}

impl<T: Transport> ConnectionHandler<T> {
    pub fn new(context: HandlerContext<T>, peer: Option<SocketAddr>) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            context,
            state: ConnectionState::ReadingRequest,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run the connection to completion and return the terminal state.
    ///
    /// The stream is shut down and dropped exactly once, on every path.
    pub async fn handle<S>(mut self, mut stream: S) -> ConnectionState
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = self.process(&mut stream).await;

        let response = match outcome {
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                tracing::debug!(connection_id = %self.id, "Client closed before sending a request");
                None
            }
            Err(e) => {
                self.transition(ConnectionState::Error);
                tracing::warn!(
                    connection_id = %self.id,
                    peer_addr = ?self.peer,
                    error = %e,
                    "Request failed"
                );
                Some(error_response(&e.to_string()))
            }
        };

        if let Some(bytes) = response {
            if let Err(e) = write_all(&mut stream, &bytes).await {
                tracing::warn!(connection_id = %self.id, error = %e, "Failed to write response");
            }
        }

        if let Err(e) = stream.shutdown().await {
            tracing::debug!(connection_id = %self.id, error = %e, "Shutdown after response failed");
        }
        drop(stream);
        self.transition(ConnectionState::Closed);
        self.state
    }

    /// Parse, select and forward. `Ok(None)` means there is nothing to answer.
    async fn process<S>(&mut self, stream: &mut S) -> Result<Option<Vec<u8>>, ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let request = match read_request(&mut reader, &self.context.limits).await? {
            Some(request) => request,
            None => return Ok(None),
        };
        tracing::debug!(
            connection_id = %self.id,
            method = %request.method,
            path = %request.path,
            version = %request.version,
            "Request parsed"
        );

        self.transition(ConnectionState::SelectingBackend);
        let backend = {
            let mut rng = rand::thread_rng();
            Arc::clone(self.context.selector.select(&self.context.backends, &mut rng))
        };

        self.transition(ConnectionState::Forwarding);
        let response = self
            .context
            .forwarder
            .forward(&request, &backend, self.peer.map(|addr| addr.ip()))
            .await?;

        self.transition(ConnectionState::WritingResponse);
        Ok(Some(response))
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(connection_id = %self.id, from = ?self.state, to = ?next, "State change");
        self.state = next;
    }
}

async fn write_all<S: AsyncWrite + Unpin>(stream: &mut S, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}
