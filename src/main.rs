//! crserver-proxy
//!
//! Routes 1C repository client calls to the repository server build that
//! matches the client's platform version.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                CRSERVER PROXY                │
//!   1C client          │  ┌────────┐   ┌────────────┐   ┌──────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│  protocol  │──▶│ registry │  │
//!                      │  │ server │   │  envelope  │   │ snapshot │  │
//!                      │  └────────┘   └────────────┘   └────┬─────┘  │
//!                      │                                     │        │       crserver
//!   ◀──────────────────┼──── streamed response ◀─────────────┴────────┼──── (per version)
//!                      │                                     ▲        │
//!                      │  ┌───────────┐   ┌────────────┐     │        │
//!                      │  │ lifecycle │   │ discovery  │─────┘        │
//!                      │  │ shutdown  │   │ Docker feed│◀─────────────┼──── Docker events
//!                      │  └───────────┘   └────────────┘              │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use crserver_proxy::config::Cli;
use crserver_proxy::http::HttpServer;
use crserver_proxy::lifecycle::{signals, start_discovery, Shutdown};
use crserver_proxy::observability::{logging, metrics};
use crserver_proxy::registry::BackendRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().load()?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("crserver-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        repository = %config.repository.url,
        discovery = ?config.discovery.mode,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let registry = Arc::new(BackendRegistry::empty());
    let discovery = start_discovery(&config, registry.clone(), &shutdown)?;

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let server = HttpServer::new(&config, registry)?;

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    // Covers the server stopping on its own as well.
    shutdown.trigger();
    if let Some(handle) = discovery {
        let _ = handle.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
