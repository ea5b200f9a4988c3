//! Request forwarding.
//!
//! # Responsibilities
//! - Answer the `/up` liveness probe locally
//! - Build the outbound request: backend authority plus request path, method, copied headers, body
//! - Add `X-Forwarded-For`, `X-Forwarded-Proto` and `X-Forwarded-Host`
//! - Execute it through the transport and serialize the response for the client
//!
//! # Design Decisions
//! - `host` and `connection` are never copied; the transport sets its own
//! - No retries: a transport failure is final for the connection
//! - Access records go to the injected `AccessLog`

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request};

use crate::http::method::HttpMethod;
use crate::http::request::InboundRequest;
use crate::http::response::{serialize_response, LIVENESS_RESPONSE};
use crate::load_balancer::Backend;
use crate::observability::{AccessLog, AccessRecord};
use crate::proxy::error::{error_chain, ProxyError, ProxyResult};
use crate::proxy::transport::Transport;

/// Path answered by the proxy itself.
pub const LIVENESS_PATH: &str = "/up";

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Inbound headers the outbound request never carries.
const STRIPPED_HEADERS: &[&str] = &["host", "connection"];

/// Forwards parsed requests to a backend over a [`Transport`].
pub struct ProxyForwarder<T> {
    transport: T,
    access_log: Arc<dyn AccessLog>,
}

impl<T: Transport> ProxyForwarder<T> {
    pub fn new(transport: T, access_log: Arc<dyn AccessLog>) -> Self {
        Self {
            transport,
            access_log,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Forward `request` to `backend` and return the raw response for the client.
    ///
    /// `client_ip` feeds `X-Forwarded-For` when the client did not send one.
    pub async fn forward(
        &self,
        request: &InboundRequest,
        backend: &Backend,
        client_ip: Option<IpAddr>,
    ) -> ProxyResult<Vec<u8>> {
        if request.path == LIVENESS_PATH {
            return Ok(LIVENESS_RESPONSE.to_vec());
        }

        let outbound = build_outbound(request, backend, client_ip)?;
        tracing::debug!(
            method = %request.method,
            uri = %outbound.uri(),
            "Forwarding request"
        );

        let response = self
            .transport
            .send(outbound)
            .await
            .map_err(|e| ProxyError::BackendUnreachable {
                backend: backend.to_string(),
                reason: e.to_string(),
            })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| ProxyError::BackendUnreachable {
                backend: backend.to_string(),
                reason: error_chain(&e),
            })?;

        let backend_name = backend.to_string();
        self.access_log.record(&AccessRecord {
            method: &request.method,
            path: &request.path,
            backend: &backend_name,
            status: parts.status.as_u16(),
        });

        let reason = parts
            .extensions
            .get::<hyper::ext::ReasonPhrase>()
            .map(|r| r.as_bytes());
        Ok(serialize_response(parts.status, reason, &parts.headers, &body))
    }
}

/// Build the request sent to `backend`.
pub fn build_outbound(
    request: &InboundRequest,
    backend: &Backend,
    client_ip: Option<IpAddr>,
) -> ProxyResult<Request<Body>> {
    let uri = backend.target(&request.path)?;
    let method: HttpMethod = request.method.parse()?;

    let mut builder = Request::builder().method(Method::from(method)).uri(uri);
    let headers = builder
        .headers_mut()
        .ok_or_else(|| ProxyError::MalformedRequest("invalid request".into()))?;

    for (name, value) in &request.headers {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.insert(header_name(name)?, header_value(name, value)?);
    }

    let forwarded_for = request
        .header("x-forwarded-for")
        .map(str::to_string)
        .or_else(|| client_ip.map(|ip| ip.to_string()));
    if let Some(forwarded_for) = forwarded_for {
        headers.insert(X_FORWARDED_FOR, header_value("x-forwarded-for", &forwarded_for)?);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    headers.insert(
        X_FORWARDED_HOST,
        header_value("host", request.header("host").unwrap_or(""))?,
    );

    let body = if request.body.is_empty() {
        Body::empty()
    } else {
        Body::from(request.body.clone())
    };
    builder
        .body(body)
        .map_err(|e| ProxyError::MalformedRequest(e.to_string()))
}

fn header_name(name: &str) -> ProxyResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ProxyError::MalformedRequest(format!("invalid header name {name:?}")))
}

fn header_value(name: &str, value: &str) -> ProxyResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ProxyError::MalformedRequest(format!("invalid value for header {name:?}")))
}
