//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest + selected Backend
//!     → forwarder.rs (liveness probe, header rewrite, X-Forwarded-*)
//!     → transport.rs (hyper-util client, timeouts)
//!     → Backend server
//!     → forwarder.rs (serialize response for the client socket)
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so the forwarder is testable without sockets
//! - Every failure is a `ProxyError` the connection handler turns into a `500`

pub mod error;
pub mod forwarder;
pub mod transport;

pub use error::{ProxyError, ProxyResult, TransportError};
pub use forwarder::{ProxyForwarder, LIVENESS_PATH};
pub use transport::{HyperTransport, Transport};
