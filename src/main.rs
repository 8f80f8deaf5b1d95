//! Admission gate server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                 ADMISSION GATE                    │
//!                    │                                                   │
//!  Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!  ──────────────────┼─▶│  http   │──▶│  scope   │──▶│     gate     │   │
//!                    │  │ server  │   │ matcher  │   │ reject/block │   │
//!                    │  └─────────┘   └────┬─────┘   └──────┬───────┘   │
//!                    │                     │ out of scope   │ admitted  │
//!                    │                     ▼                ▼           │
//!  Client Response   │              ┌────────────────────────────┐      │
//!  ◀─────────────────┼──────────────│   status / upstream fwd    │◀─────┼── Upstream
//!                    │              └────────────────────────────┘      │
//!                    │                                                   │
//!                    │  config · lifecycle · observability (cross-cut)  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use admission_gate::config::loader;
use admission_gate::http::HttpServer;
use admission_gate::lifecycle::{signals, startup, ServiceContext, Shutdown};
use admission_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "admission-gate")]
#[command(about = "Concurrent request admission gate", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = loader::load(cli.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!("admission-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = ?config.upstream.address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = Arc::new(ServiceContext::new());
    let gate = match context.configure_gate(&config.admission) {
        Ok(gate) => gate,
        Err(e) => {
            tracing::error!(error = %e, "Invalid admission configuration");
            return Err(e.into());
        }
    };

    let listener = startup::bind_listener(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, context, gate);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
