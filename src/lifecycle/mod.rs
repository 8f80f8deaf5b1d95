//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Configure gate (once) → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close gate → Drain requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then gate, then listener
//! - Closing the gate wakes blocked waiters so draining cannot stall on them
//! - ServiceContext is an explicit value, not a global

pub mod context;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use context::ServiceContext;
pub use shutdown::Shutdown;
pub use startup::StartupError;
