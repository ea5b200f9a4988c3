//! Request parsing.
//!
//! # Responsibilities
//! - Read one HTTP/1.x request off a raw client stream
//! - Split the request line into method, path and version
//! - Collect headers (lower-cased names, last occurrence wins)
//! - Read a fixed-length body when `content-length` is present
//!
//! # Design Decisions
//! - Header section and body sizes are capped before anything is buffered
//! - Chunked transfer-encoding is not decoded; without `content-length` the body is empty
//! - A peer that closes before sending a byte is not an error: there is nobody to answer

use std::collections::HashMap;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::proxy::{ProxyError, ProxyResult};

/// A parsed inbound request, scoped to one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    /// Lower-cased header names. Repeated headers keep the last value.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    /// Look up a header by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Size caps applied while reading a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl From<&LimitsConfig> for RequestLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

/// Read a single request from `reader`.
///
/// Returns `Ok(None)` if the stream ends before the first byte.
pub async fn read_request<R>(reader: &mut R, limits: &RequestLimits) -> ProxyResult<Option<InboundRequest>>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = limits.max_header_bytes;

    let request_line = match read_line(reader, &mut budget).await? {
        Some(line) => line,
        None => return Ok(None),
    };
    // Tokens past the third are ignored.
    let mut tokens = request_line.split_whitespace();
    let (Some(method), Some(path), Some(version)) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ProxyError::MalformedRequest(format!(
            "expected 'METHOD PATH VERSION', got {request_line:?}"
        )));
    };
    let mut request = InboundRequest {
        method: method.to_string(),
        path: path.to_string(),
        version: version.to_string(),
        ..Default::default()
    };

    loop {
        let line = read_line(reader, &mut budget)
            .await?
            .ok_or(ProxyError::ConnectionClosed)?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(": ")
            .ok_or_else(|| ProxyError::MalformedRequest(format!("invalid header line {line:?}")))?;
        request.headers.insert(name.to_ascii_lowercase(), value.to_string());
    }

    if let Some(raw) = request.headers.get("content-length") {
        let length: usize = raw
            .trim()
            .parse()
            .map_err(|_| ProxyError::MalformedRequest(format!("invalid content-length {raw:?}")))?;
        if length > limits.max_body_bytes {
            return Err(ProxyError::MalformedRequest(format!(
                "content-length {length} exceeds limit of {} bytes",
                limits.max_body_bytes
            )));
        }
        request.body = vec![0; length];
        reader.read_exact(&mut request.body).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProxyError::ConnectionClosed,
            _ => ProxyError::Io(e),
        })?;
    }

    Ok(Some(request))
}

/// Read one line without its terminator, charging its length to `budget`.
///
/// `Ok(None)` means the stream ended before any byte of the line.
async fn read_line<R>(reader: &mut R, budget: &mut usize) -> ProxyResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(*budget as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return if *budget == 0 {
            Err(header_overflow())
        } else {
            Ok(None)
        };
    }
    if buf.last() != Some(&b'\n') {
        return if read == *budget {
            Err(header_overflow())
        } else {
            Err(ProxyError::ConnectionClosed)
        };
    }
    *budget -= read;

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ProxyError::MalformedRequest("request head is not valid UTF-8".into()))
}

fn header_overflow() -> ProxyError {
    ProxyError::MalformedRequest("request head exceeds size limit".into())
}
