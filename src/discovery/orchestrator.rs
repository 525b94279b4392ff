//! Orchestration layer contract.
//!
//! The discovery feed only needs three things from the layer that runs the
//! repository servers: list labelled instances, inspect one, and follow
//! start/stop events. Docker implements this in `docker.rs`; tests use an
//! in-memory fake.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Error type for discovery operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("cannot connect to orchestrator: {0}")]
    Connect(String),

    #[error("orchestrator request failed: {0}")]
    Request(String),

    #[error("event stream failed: {0}")]
    Stream(String),

    #[error("event stream ended")]
    StreamEnded,

    #[error("discovery task aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),
}

/// One running instance matching the discovery label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub id: String,
    /// Human-readable name, for logs.
    pub name: String,
    /// Image reference; the segment after the last `:` is the version.
    pub image: String,
}

/// Network details of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDetails {
    /// Address reachable from the proxy, if the instance has one.
    pub address: Option<String>,
    /// Container-side ports the instance exposes.
    pub exposed_ports: Vec<u16>,
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Stopped,
    Other(String),
}

/// A lifecycle change reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub instance_id: String,
}

/// Stream of lifecycle events; ends or yields an error when the subscription breaks.
pub type EventStream = BoxStream<'static, Result<LifecycleEvent, DiscoveryError>>;

/// Factory for orchestrator sessions.
#[async_trait]
pub trait Orchestrator: Send + Sync + 'static {
    /// Open a fresh session. Called on every (re)start of the feed.
    async fn connect(&self) -> Result<Box<dyn OrchestratorSession>, DiscoveryError>;
}

/// A live session with the orchestrator, owned by the discovery task.
#[async_trait]
pub trait OrchestratorSession: Send + Sync {
    /// Running instances carrying `label`.
    async fn list_instances(&self, label: &str) -> Result<Vec<InstanceDescriptor>, DiscoveryError>;

    /// Address and exposed ports of one instance.
    async fn inspect(&self, id: &str) -> Result<InstanceDetails, DiscoveryError>;

    /// Start/stop events for instances carrying `label`.
    async fn subscribe_events(&self, label: &str) -> Result<EventStream, DiscoveryError>;
}
