//! Startup orchestration.
//!
//! # Responsibilities
//! - Populate the registry according to the discovery mode
//! - Start the supervised discovery feed in Docker mode
//!
//! # Design Decisions
//! - Fail fast: a bad repository URL or an unusable Docker client is fatal
//! - Once running, discovery failures are handled by the supervisor

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{DiscoveryConfig, DiscoveryMode, ProxyConfig};
use crate::discovery::{DiscoveryError, DiscoveryFeed, DockerOrchestrator, Orchestrator, Supervisor};
use crate::http::{UpstreamBase, UpstreamError};
use crate::lifecycle::Shutdown;
use crate::registry::{BackendRegistry, Snapshot};

/// Error type for process startup. All variants are fatal.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid repository URL: {0}")]
    Repository(#[from] UpstreamError),

    #[error("cannot create orchestrator client: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Populate `registry` for the configured discovery mode.
///
/// Returns the supervisor task when discovery is dynamic. `Auto` is
/// expected to be resolved already (`Cli::load`); left unresolved it is
/// treated as static.
pub fn start_discovery(
    config: &ProxyConfig,
    registry: Arc<BackendRegistry>,
    shutdown: &Shutdown,
) -> Result<Option<JoinHandle<()>>, StartupError> {
    match config.discovery.mode {
        DiscoveryMode::Docker => {
            let orchestrator = DockerOrchestrator::from_env()?;
            tracing::info!(label = %config.discovery.label, "Using Docker discovery");
            Ok(Some(start_feed(
                Arc::new(orchestrator),
                registry,
                &config.discovery,
                shutdown,
            )))
        }
        DiscoveryMode::Static | DiscoveryMode::Auto => {
            let upstream = UpstreamBase::parse(&config.repository.url)?;
            tracing::info!(backend = %upstream.endpoint(), "Using static backend for all versions");
            registry.replace(Snapshot::wildcard(upstream.endpoint().clone()));
            Ok(None)
        }
    }
}

/// Run a discovery feed for `orchestrator` under the supervisor.
pub fn start_feed(
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<BackendRegistry>,
    config: &DiscoveryConfig,
    shutdown: &Shutdown,
) -> JoinHandle<()> {
    let feed = DiscoveryFeed::new(orchestrator, registry, config);
    Supervisor::new(feed, config.retry_interval()).spawn(shutdown.subscribe())
}
