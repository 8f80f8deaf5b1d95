//! Service status and health check endpoints.
//!
//! # Endpoints
//! - `GET /status[?liveness_check=true|false][&format=json]`
//! - `GET /health_check`: like `/status`, but 500 unless the state is OK
//!
//! A liveness check is shallow: it skips the admission counters.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admission::GateSnapshot;
use crate::http::request::request_id_of;
use crate::http::response::ServiceError;
use crate::http::server::AppState;

const LIVENESS_CHECK_PARAM: &str = "liveness_check";

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok,
    Error,
}

/// Body of `/status` and `/health_check`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub version: &'static str,
    pub up_time_secs: u64,
    pub request_count: u64,
    pub host_name: String,
    pub service_state: ServiceState,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub admission: Option<GateSnapshot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub liveness_check: Option<String>,
}

pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    headers: HeaderMap,
) -> Response {
    match build_status(&state, &query) {
        Ok(status) => Json(status).into_response(),
        Err(error) => error
            .with_correlation_id(request_id_of(&headers))
            .into_response(),
    }
}

pub async fn health_check(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let status = service_status(&state, false);
    if status.service_state == ServiceState::Ok {
        return Json(status).into_response();
    }

    tracing::warn!(state = ?status.service_state, "Health check failed");
    ServiceError::new(StatusCode::INTERNAL_SERVER_ERROR)
        .with_description(format!("Service state is {:?}", status.service_state))
        .with_correlation_id(request_id_of(&headers))
        .into_response()
}

fn build_status(state: &AppState, query: &StatusQuery) -> Result<ServiceStatus, ServiceError> {
    let liveness = match query.liveness_check.as_deref().map(str::to_ascii_lowercase) {
        None => false,
        Some(value) if value == "false" => false,
        Some(value) if value == "true" => true,
        Some(value) => {
            tracing::error!(value = %value, "Unknown {LIVENESS_CHECK_PARAM} value");
            return Err(not_acceptable(format!(
                "Invalid value for query parameter '{LIVENESS_CHECK_PARAM}', should be true or false"
            )));
        }
    };

    match query.format.as_deref() {
        None | Some("") | Some("json") => {}
        Some(other) => {
            return Err(not_acceptable(format!("Unsupported response format '{other}'")));
        }
    }

    Ok(service_status(state, liveness))
}

fn service_status(state: &AppState, liveness: bool) -> ServiceStatus {
    let service_state = if state.context.is_shutting_down() {
        ServiceState::Error
    } else {
        ServiceState::Ok
    };

    let admission = (!liveness && state.gate.is_enabled()).then(|| state.gate.snapshot());

    ServiceStatus {
        version: env!("CARGO_PKG_VERSION"),
        up_time_secs: state.context.uptime().as_secs(),
        request_count: state.context.request_count(),
        host_name: host_name(),
        service_state,
        admission,
    }
}

fn not_acceptable(description: String) -> ServiceError {
    ServiceError::new(StatusCode::NOT_ACCEPTABLE).with_description(description)
}

fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
