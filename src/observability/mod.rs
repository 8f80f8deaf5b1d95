//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! admission gate, HTTP layer
//!     → logging.rs (structured log events, "Concurrent event" lines)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through logs and error bodies
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
