//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → middleware/admission.rs (scope check, gate acquire, 503 on reject)
//!     → status.rs (/status, /health_check) or forward.rs (upstream)
//!     → response.rs (JSON ServiceError for locally produced errors)
//!     → Send to client
//! ```

pub mod forward;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{request_id_of, UuidRequestId, X_REQUEST_ID};
pub use response::ServiceError;
pub use server::{AppState, HttpServer};
