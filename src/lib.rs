//! Concurrent request admission gate.
//!
//! Bounds the number of requests a service executes at once: requests over
//! the reject threshold get an immediate 503, requests over the lower
//! blocking threshold wait for a slot. Only request paths matching the
//! configured patterns are subject to the gate.

pub mod admission;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use admission::{Admission, AdmissionPermit, Gate, GateSnapshot, RejectReason};
pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::{ServiceContext, Shutdown};
