//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (per-connection state machine)
//!     → http::request / load_balancer / proxy
//!
//! Connection States:
//!     ReadingRequest → SelectingBackend → Forwarding → WritingResponse → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion; the ceiling is configurable
//! - One Tokio task per connection, one request per connection
//! - Each socket is owned by its handler and closed exactly once

pub mod connection;
pub mod listener;

pub use connection::{ConnectionHandler, ConnectionId, ConnectionState, HandlerContext};
pub use listener::{Accepted, ConnectionPermit, Listener, ListenerError};
