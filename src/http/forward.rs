//! Forwarding to the guarded upstream application.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream authority
//! - Propagate the request ID (headers are copied as-is)
//! - Stream the upstream response back unchanged
//! - Map upstream failures to 502, missing upstream to 404

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};

use crate::http::request::request_id_of;
use crate::http::response::ServiceError;
use crate::http::server::AppState;

/// Fallback handler: forward the request upstream.
pub async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id_of(request.headers()).map(str::to_string);

    let Some(upstream) = state.upstream.as_ref() else {
        return ServiceError::new(StatusCode::NOT_FOUND)
            .with_description(format!("No resource at {}", request.uri().path()))
            .with_correlation_id(request_id.as_deref())
            .into_response();
    };

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = ?request_id, error = %e, "Failed to build upstream URI");
            return ServiceError::new(StatusCode::BAD_REQUEST)
                .with_correlation_id(request_id.as_deref())
                .into_response();
        }
    };
    // Let the client derive Host from the rewritten URI.
    parts.headers.remove(header::HOST);

    tracing::debug!(
        request_id = ?request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = ?request_id, upstream = %upstream, error = %e, "Upstream error");
            ServiceError::new(StatusCode::BAD_GATEWAY)
                .with_description("Upstream request failed")
                .with_correlation_id(request_id.as_deref())
                .into_response()
        }
    }
}
