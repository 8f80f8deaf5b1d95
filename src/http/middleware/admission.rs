//! Admission dispatch middleware.
//! Puts in-scope requests through the gate; everything else passes.
//!
//! An admitted request stays counted until its response body has been
//! fully sent or dropped, not just until the handler returns the head.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::admission::{Admission, AdmissionPermit, RejectReason};
use crate::http::request::request_id_of;
use crate::http::response::ServiceError;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    state.context.record_request();

    let response = if state.gate.is_in_scope(request.uri().path()) {
        admit(state, request, next).await
    } else {
        next.run(request).await
    };

    metrics::record_request(&method, response.status().as_u16(), started);
    response
}

async fn admit(state: AppState, request: Request<Body>, next: Next) -> Response {
    match state.gate.acquire().await {
        Admission::Admitted(permit) => {
            // Dropping the handler future mid-flight drops the permit too.
            let response = next.run(request).await;
            hold_until_body_ends(response, permit)
        }
        Admission::Rejected(reason) => {
            let request_id = request_id_of(request.headers());
            tracing::warn!(
                request_id = request_id.unwrap_or("unknown"),
                path = %request.uri().path(),
                reason = %reason,
                "Request not admitted"
            );
            rejection(reason, state.gate.thresholds().reject())
                .with_correlation_id(request_id)
                .into_response()
        }
    }
}

/// Move `permit` into the response body so the slot is released when the
/// body finishes streaming or the connection drops it.
fn hold_until_body_ends(response: Response, permit: AdmissionPermit) -> Response {
    let (parts, body) = response.into_parts();
    let stream = body.into_data_stream().map(move |chunk| {
        let _held = &permit;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(stream))
}

fn rejection(reason: RejectReason, reject_threshold: usize) -> ServiceError {
    let description = match reason {
        RejectReason::AtCapacity => format!("Too many concurrent requests, {reject_threshold}"),
        RejectReason::WaitTimedOut => "Timed out waiting for a request slot".to_string(),
        RejectReason::ShuttingDown => "Service is shutting down".to_string(),
    };
    ServiceError::new(StatusCode::SERVICE_UNAVAILABLE).with_description(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{Gate, ScopeMatcher, Thresholds};
    use crate::config::AdmissionSettings;
    use std::sync::Arc;

    fn gate(reject: usize) -> Arc<Gate> {
        let settings = AdmissionSettings {
            reject_threshold: Some(reject.to_string()),
            ..Default::default()
        };
        Arc::new(Gate::new(
            Thresholds::resolve(&settings).unwrap(),
            ScopeMatcher::empty(),
        ))
    }

    #[test]
    fn every_rejection_is_service_unavailable() {
        for reason in [
            RejectReason::AtCapacity,
            RejectReason::WaitTimedOut,
            RejectReason::ShuttingDown,
        ] {
            assert_eq!(rejection(reason, 5).status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[tokio::test]
    async fn permit_is_held_until_body_is_consumed() {
        let gate = gate(1);
        let permit = gate.acquire().await.into_permit().unwrap();

        let response = hold_until_body_ends(Response::new(Body::from("payload")), permit);
        assert_eq!(gate.snapshot().concurrent_requests, 1);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
        assert_eq!(gate.snapshot().concurrent_requests, 0);
    }

    #[tokio::test]
    async fn dropping_the_body_releases_the_permit() {
        let gate = gate(2);
        let permit = gate.acquire().await.into_permit().unwrap();

        let response = hold_until_body_ends(Response::new(Body::from("unread")), permit);
        assert_eq!(gate.snapshot().concurrent_requests, 1);
        drop(response);
        assert_eq!(gate.snapshot().concurrent_requests, 0);
    }

    #[test]
    fn capacity_rejection_names_threshold() {
        let error = rejection(RejectReason::AtCapacity, 12);
        assert_eq!(
            error.description.as_deref(),
            Some("Too many concurrent requests, 12")
        );
    }
}
