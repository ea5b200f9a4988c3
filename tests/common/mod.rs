//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wrr_proxy::config::{BackendConfig, ProxyConfig};
use wrr_proxy::http::RequestLimits;
use wrr_proxy::load_balancer::BackendSet;
use wrr_proxy::net::Listener;
use wrr_proxy::observability::TracingAccessLog;
use wrr_proxy::proxy::{Transport, TransportError};
use wrr_proxy::{ProxyServer, Shutdown};

/// Start a simple mock backend that returns a fixed response. Returns its address.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an axum app as a backend. Returns its address.
pub async fn start_axum_backend(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap()
}

pub fn backend(addr: SocketAddr, weight: f64) -> BackendConfig {
    BackendConfig {
        address: format!("http://{addr}"),
        weight,
    }
}

/// A running proxy. Dropping it stops the accept loop.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the real proxy (hyper transport) for the given backends.
pub async fn start_proxy(backends: Vec<BackendConfig>) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.request_secs = 5;
    config.backends = backends;

    let server = ProxyServer::new(&config).unwrap();
    let listener = Listener::bind(&config.listener).await.unwrap();
    spawn_server(server, listener)
}

/// Start the proxy over a custom transport.
pub async fn start_proxy_with_transport<T: Transport>(backends: Vec<BackendConfig>, transport: T) -> TestProxy {
    let backends = BackendSet::from_config(&backends).unwrap();
    let server = ProxyServer::with_transport(
        backends,
        transport,
        Arc::new(TracingAccessLog),
        RequestLimits::default(),
    );
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    spawn_server(server, Listener::from_tcp(tcp, 64))
}

fn spawn_server<T: Transport>(server: ProxyServer<T>, listener: Listener) -> TestProxy {
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    TestProxy { addr, shutdown }
}

/// Write a raw request and read until the proxy closes the connection.
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// A client that opens a fresh connection per request, matching the proxy's
/// one-request-per-connection behavior.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Transport double that counts calls and answers `204`.
#[derive(Default, Clone)]
pub struct CountingTransport {
    pub calls: Arc<AtomicUsize>,
}

impl CountingTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn send(
        &self,
        _request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, TransportError>> + Send {
        let calls = Arc::clone(&self.calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::builder().status(204).body(Body::empty()).unwrap())
        }
    }
}
