//! Bounded accept for the proxy's listening socket.
//!
//! The proxy serves one request per connection, so the number of live
//! connections equals the number of in-flight forwards. `listener.max_connections`
//! (10 000 by default) caps that number: each accepted socket carries a
//! [`ConnectionPermit`] drawn from a semaphore, and the next `accept` waits for
//! a permit before taking another socket off the kernel backlog.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to bind: {0}")]
    Bind(io::Error),
    #[error("Failed to accept: {0}")]
    Accept(io::Error),
    /// The permit semaphore was closed; no further connections can be admitted.
    #[error("Connection limiter closed")]
    Closed,
}

/// A client socket admitted under the connection ceiling.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    /// Hold until the connection is closed.
    pub permit: ConnectionPermit,
}

/// Listening socket plus the permits that bound concurrent connections.
pub struct Listener {
    socket: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind `listener.bind_address` with a ceiling of `listener.max_connections`.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| ListenerError::Bind(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let socket = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        Ok(Self::from_tcp(socket, config.max_connections))
    }

    /// Use an already bound socket, e.g. one on an ephemeral port.
    pub fn from_tcp(socket: TcpListener, max_connections: usize) -> Self {
        match socket.local_addr() {
            Ok(address) => tracing::info!(%address, max_connections, "Listening"),
            Err(e) => tracing::warn!(error = %e, max_connections, "Listening on unknown address"),
        }
        Self {
            socket,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Wait for a free slot, then for the next client.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;
        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %peer,
            free_slots = self.slots.available_permits(),
            "Connection admitted"
        );
        Ok(Accepted {
            stream,
            peer,
            permit: ConnectionPermit(permit),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Slots not currently held by a connection.
    pub fn available_permits(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One slot under the connection ceiling, released on drop (panics included).
#[derive(Debug)]
pub struct ConnectionPermit(#[allow(dead_code)] OwnedSemaphorePermit);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(bind_address: &str, max_connections: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: bind_address.into(),
            max_connections,
        }
    }

    #[tokio::test]
    async fn ceiling_holds_back_further_clients() {
        let listener = Listener::bind(&config("127.0.0.1:0", 1)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(listener.max_connections(), 1);

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let first = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 0);

        // The second client stays in the backlog while the first holds the slot.
        let blocked = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(blocked.is_err());

        drop(first.permit);
        let second = tokio::time::timeout(Duration::from_secs(2), listener.accept()).await;
        assert!(matches!(second, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn accepted_connection_reports_peer() {
        let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener = Listener::from_tcp(socket, 4);
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();

        let accepted = listener.accept().await.unwrap();
        assert_eq!(accepted.peer, client.local_addr().unwrap());
        assert_eq!(listener.available_permits(), 3);
    }

    #[tokio::test]
    async fn bad_address_fails_to_bind() {
        assert!(matches!(
            Listener::bind(&config("nowhere", 1)).await,
            Err(ListenerError::Bind(_))
        ));
    }
}
