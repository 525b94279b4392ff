//! Backend discovery subsystem.
//!
//! # Data Flow
//! ```text
//! supervisor.rs (fixed-delay restart loop)
//!     → feed.rs (Connecting → Reconciling → Listening)
//!         → orchestrator.rs contract (docker.rs in production)
//!         → reconcile.rs (list → inspect → port check → image tag → Snapshot)
//!     → BackendRegistry::replace (whole snapshot)
//! ```
//!
//! # Design Decisions
//! - The orchestrator session is owned by the feed task alone
//! - Any failure restarts the whole machine; nothing is patched incrementally
//! - Discovery errors never reach callers and never end the process

pub mod docker;
pub mod feed;
pub mod orchestrator;
pub mod reconcile;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use docker::DockerOrchestrator;
pub use feed::{DiscoveryFeed, FeedState};
pub use orchestrator::{
    DiscoveryError, EventKind, EventStream, InstanceDescriptor, InstanceDetails, LifecycleEvent,
    Orchestrator, OrchestratorSession,
};
pub use supervisor::Supervisor;
