//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (connection_id, peer_addr, backend)
//!
//! The forwarder additionally produces:
//!     → logging.rs AccessLog (one record per forwarded request)
//!
//! Consumers:
//!     → stdout via tracing-subscriber (pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Connection ID flows through every event of a connection
//! - Access log is injected, not global, so components test in isolation

pub mod logging;

pub use logging::{init_logging, AccessLog, AccessRecord, TracingAccessLog};
