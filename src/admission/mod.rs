//! Concurrent request admission control.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     AdmissionSettings (raw strings)
//!     → thresholds.rs (reject / blocking / CPU clamp / wait timeout)
//!     → scope.rs (compile URI patterns)
//!     → gate.rs (Gate, shared via Arc)
//!
//! Per request:
//!     path → Gate::is_in_scope
//!         → Gate::acquire → Admitted(permit) | Rejected(reason)
//!         → handler runs → permit dropped (release)
//! ```
//!
//! # Design Decisions
//! - Two tiers on one counter: over the reject threshold fails fast,
//!   over the blocking threshold waits for a slot
//! - Counter mutex and blocking semaphore are independent primitives
//! - Cancellation while waiting uncounts the request (not admitted)
//! - Counters live as long as the gate and are never reset

pub mod gate;
pub mod scope;
pub mod stats;
pub mod thresholds;

pub use gate::{Admission, AdmissionPermit, Gate, RejectReason};
pub use scope::ScopeMatcher;
pub use stats::GateSnapshot;
pub use thresholds::Thresholds;
