//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with status endpoints and the upstream fallback
//! - Wire up middleware (request ID, tracing, timeout, admission)
//! - Serve until shutdown, closing the admission gate when it begins

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::uri::Authority,
    middleware,
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::Gate;
use crate::config::GateConfig;
use crate::http::forward::forward_handler;
use crate::http::middleware::admission_middleware;
use crate::http::request::UuidRequestId;
use crate::http::status::{get_status, health_check};
use crate::lifecycle::ServiceContext;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ServiceContext>,
    pub gate: Arc<Gate>,
    pub client: Client<HttpConnector, Body>,
    pub upstream: Option<Authority>,
}

/// HTTP front-end for the admission gate.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server. The gate must already be configured on
    /// `context`; it is passed separately so handlers need no lookup.
    pub fn new(config: GateConfig, context: Arc<ServiceContext>, gate: Arc<Gate>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let upstream = config
            .upstream
            .address
            .as_deref()
            .and_then(|a| a.parse::<Authority>().ok());
        if upstream.is_none() {
            tracing::info!("No upstream configured; serving status endpoints only");
        }

        let state = AppState {
            context,
            gate,
            client,
            upstream,
        };

        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        Router::new()
            .route("/status", get(get_status))
            .route("/health_check", get(health_check))
            .fallback(forward_handler)
            .layer(middleware::from_fn_with_state(state.clone(), admission_middleware))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let context = Arc::clone(&self.state.context);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                context.begin_shutdown();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
