//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, spawn per connection)
//!     → request.rs (parse request line, headers, fixed-length body)
//!     → [load balancer picks backend]
//!     → method.rs (closed set of forwardable methods)
//!     → [forwarder calls backend]
//!     → response.rs (serialize for the client socket)
//!     → Send to client, close
//! ```

pub mod method;
pub mod request;
pub mod response;
pub mod server;

pub use method::HttpMethod;
pub use request::{read_request, InboundRequest, RequestLimits};
pub use server::ProxyServer;
