//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: [[backends]] config
//!     → weights.rs (normalize raw weights to percentages)
//!     → backend.rs (ordered, immutable BackendSet)
//!
//! Per connection:
//!     → weighted.rs (random draw in [0, 100), cumulative walk)
//!     → Arc<Backend> handed to the forwarder
//! ```
//!
//! # Design Decisions
//! - Selector is stateless; the backend set is read-only after startup
//! - No locks on the hot path: handlers share the set through an `Arc`
//! - Rounding gaps resolve to a fixed fallback instead of an error

pub mod backend;
pub mod weighted;
pub mod weights;

pub use backend::{Backend, BackendSet};
pub use weighted::WeightedSelector;
pub use weights::normalize_weights;
