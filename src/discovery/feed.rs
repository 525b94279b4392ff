//! Discovery feed state machine.
//!
//! # States
//! ```text
//! Disconnected → Connecting → Reconciling → Listening
//!                                  ▲            │ event
//!                                  └────────────┘
//! Listening → (stream error or end) → Disconnected   [supervisor.rs restarts]
//! ```
//!
//! # Design Decisions
//! - Every event triggers a full re-enumeration; events are never diffed
//! - The event subscription is opened before the first enumeration, so a
//!   change between the two is still seen
//! - One pass of the machine ends only with an error; recovery lives in the
//!   supervisor

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;

use crate::config::DiscoveryConfig;
use crate::discovery::orchestrator::{DiscoveryError, Orchestrator, OrchestratorSession};
use crate::discovery::reconcile::reconcile;
use crate::observability::metrics;
use crate::registry::BackendRegistry;

/// Observable state of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Reconciling,
    Listening,
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedState::Disconnected => "disconnected",
            FeedState::Connecting => "connecting",
            FeedState::Reconciling => "reconciling",
            FeedState::Listening => "listening",
        };
        f.write_str(name)
    }
}

struct FeedInner {
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<BackendRegistry>,
    label: String,
    service_port: u16,
    state: watch::Sender<FeedState>,
}

/// Keeps the registry in sync with the orchestrator. Clones share state.
#[derive(Clone)]
pub struct DiscoveryFeed {
    inner: Arc<FeedInner>,
}

impl DiscoveryFeed {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        registry: Arc<BackendRegistry>,
        config: &DiscoveryConfig,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::Disconnected);
        Self {
            inner: Arc::new(FeedInner {
                orchestrator,
                registry,
                label: config.label.clone(),
                service_port: config.service_port,
                state,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> FeedState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    pub(crate) fn set_state(&self, next: FeedState) {
        let previous = self.inner.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Discovery feed state");
        }
    }

    /// Run one pass of the state machine: connect, subscribe, enumerate,
    /// then re-enumerate on every event until the session breaks.
    pub async fn run(&self) -> Result<Infallible, DiscoveryError> {
        self.set_state(FeedState::Connecting);
        let session = self.inner.orchestrator.connect().await?;

        let mut events = session.subscribe_events(&self.inner.label).await?;

        self.set_state(FeedState::Reconciling);
        self.refresh(session.as_ref()).await?;
        self.set_state(FeedState::Listening);
        tracing::info!(label = %self.inner.label, "Listening for lifecycle events");

        while let Some(event) = events.next().await {
            let event = event?;
            tracing::info!(kind = ?event.kind, instance = %event.instance_id, "Lifecycle event");

            self.set_state(FeedState::Reconciling);
            self.refresh(session.as_ref()).await?;
            self.set_state(FeedState::Listening);
        }

        Err(DiscoveryError::StreamEnded)
    }

    async fn refresh(&self, session: &dyn OrchestratorSession) -> Result<(), DiscoveryError> {
        let snapshot = reconcile(session, &self.inner.label, self.inner.service_port).await?;
        metrics::record_reconciliation();
        self.inner.registry.replace(snapshot);
        Ok(())
    }
}
