//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Normalize weights → Bind listener → Accept
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C received → broadcast → accept loop stops → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when backends are ready)
//! - In-flight connections are not cancelled

pub mod shutdown;

pub use shutdown::{trigger_on_ctrl_c, Shutdown};
