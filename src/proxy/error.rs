//! Errors raised while serving a single connection.

use std::time::Duration;

/// Failures that end one connection with a `500` response.
///
/// None of these reach the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request line or headers could not be parsed.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The client closed the connection before the request was complete.
    #[error("Connection closed before the request was complete")]
    ConnectionClosed,

    /// The method is not one the outbound transport can send.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Connecting to or talking with the backend failed.
    #[error("Backend {backend} unreachable: {reason}")]
    BackendUnreachable { backend: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for connection handling.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Failures reported by an outbound [`Transport`](crate::proxy::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, DNS or protocol failure.
    #[error("{0}")]
    Connect(String),

    /// The backend did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Render an error with its whole `source()` chain, e.g.
/// `client error (Connect): tcp connect error: Connection refused`.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
