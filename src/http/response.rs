//! Response serialization.
//!
//! # Responsibilities
//! - Turn a backend response into raw bytes for the client socket
//! - Build the fixed `500` response used for every per-connection failure
//! - Provide the liveness probe reply
//!
//! # Design Decisions
//! - Body bytes are copied exactly as the transport delivered them
//! - `transfer-encoding` is dropped because the transport already de-framed the body;
//!   `content-length` is added when the backend did not send one
//! - Repeated response headers are folded into one line, values joined with ", "

use axum::http::{header, HeaderMap, StatusCode};

/// Reply to `GET /up`. Deliberately not a full HTTP/1.1 response.
pub const LIVENESS_RESPONSE: &[u8] = b"HTTP/0.9 200 OK";

/// Serialize a status, header map and body as an HTTP/1.1 response.
///
/// `reason` overrides the canonical reason phrase (e.g. one preserved from the backend).
pub fn serialize_response(status: StatusCode, reason: Option<&[u8]>, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + body.len());
    out.extend_from_slice(format!("HTTP/1.1 {} ", status.as_u16()).as_bytes());
    match reason {
        Some(reason) => out.extend_from_slice(reason),
        None => out.extend_from_slice(status.canonical_reason().unwrap_or("").as_bytes()),
    }
    out.extend_from_slice(b"\r\n");

    for name in headers.keys() {
        if *name == header::TRANSFER_ENCODING {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        for (i, value) in headers.get_all(name).iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(b", ");
            }
            out.extend_from_slice(value.as_bytes());
        }
        out.extend_from_slice(b"\r\n");
    }
    if !headers.contains_key(header::CONTENT_LENGTH) {
        out.extend_from_slice(format!("content-length: {}\r\n", body.len()).as_bytes());
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// The `500 Internal Server Error` response carrying `message` as plain text.
pub fn error_response(message: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 500 Internal Server Error\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        message.len(),
        message
    )
    .into_bytes()
}
