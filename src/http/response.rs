//! Error response bodies.
//!
//! Every error the gate produces itself (rejection, no upstream, upstream
//! failure, bad status query) is a JSON `ServiceError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Severity carried in a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorLevel {
    #[default]
    Error,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceError {
    pub code: u16,
    pub message: String,
    pub level: ErrorLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ServiceError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            level: ErrorLevel::Error,
            description: None,
            correlation_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_correlation_id(mut self, id: Option<&str>) -> Self {
        self.correlation_id = id.map(str::to_string);
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_canonical_reason_as_message() {
        let error = ServiceError::new(StatusCode::SERVICE_UNAVAILABLE)
            .with_description("Too many concurrent requests, 5")
            .with_correlation_id(Some("req-1"));

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["code"], 503);
        assert_eq!(value["message"], "Service Unavailable");
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["description"], "Too many concurrent requests, 5");
        assert_eq!(value["correlation_id"], "req-1");
    }

    #[test]
    fn omits_empty_optional_fields() {
        let value = serde_json::to_value(ServiceError::new(StatusCode::NOT_FOUND)).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("correlation_id").is_none());
    }

    #[test]
    fn response_carries_status() {
        let response = ServiceError::new(StatusCode::BAD_GATEWAY).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
