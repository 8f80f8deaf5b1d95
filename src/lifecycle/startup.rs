//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The admission gate is configured before the listener binds, so no
//!   request is ever served under an unresolved policy

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, ListenerConfig};

/// Errors that stop the process from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("admission gate is already configured")]
    AlreadyInitialized,

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the configured listener address.
pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let bind_error = |source| StartupError::Bind {
        address: config.bind_address.clone(),
        source,
    };

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;
    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
