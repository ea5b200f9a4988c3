//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Send one request to a backend and return its buffered response
//! - Enforce connect and request timeouts
//!
//! # Design Decisions
//! - The forwarder only sees the `Transport` trait, so tests can swap in doubles
//! - No idle pooling: every forwarded request opens and closes its own connection
//! - Response bodies are fully buffered; the client socket is written in one go

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::proxy::error::{error_chain, TransportError};

/// Capability to execute an HTTP request against a backend.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve to the backend's response.
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, TransportError>> + Send;
}

/// Transport backed by the hyper-util client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HyperTransport {
    /// Build a client honoring the configured timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response: Response<hyper::body::Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| TransportError::Connect(error_chain(&e)))?;

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), usize::MAX)
            .await
            .map_err(|e| TransportError::Body(error_chain(&e)))?;

        Ok(Response::from_parts(parts, Body::from(bytes)))
    }
}

impl Transport for HyperTransport {
    fn send(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, TransportError>> + Send {
        async move {
            match tokio::time::timeout(self.request_timeout, self.exchange(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.request_timeout)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn timeouts(request_secs: u64) -> TimeoutConfig {
        TimeoutConfig {
            connect_secs: 1,
            request_secs,
        }
    }

    #[tokio::test]
    async fn buffers_backend_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\nX-Backend: one\r\n\r\nok")
                .await
                .unwrap();
        });

        let transport = HyperTransport::new(&timeouts(5));
        let request = Request::builder()
            .uri(format!("http://{addr}/items"))
            .body(Body::empty())
            .unwrap();
        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(response.headers()["x-backend"], "one");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        // Bind then drop to get a port with nothing listening.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

        let transport = HyperTransport::new(&timeouts(5));
        let request = Request::builder()
            .uri(format!("http://{addr}/"))
            .body(Body::empty())
            .unwrap();
        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let transport = HyperTransport::new(&timeouts(1));
        let request = Request::builder()
            .uri(format!("http://{addr}/"))
            .body(Body::empty())
            .unwrap();
        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }
}
