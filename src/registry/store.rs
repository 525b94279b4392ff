//! Shared registry slot.
//!
//! # Responsibilities
//! - Hold the current snapshot behind an atomic pointer
//! - Resolve versions for the dispatcher
//! - Accept whole-snapshot replacements from discovery

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::registry::endpoint::Endpoint;
use crate::registry::snapshot::Snapshot;

/// Error type for registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no backend registered for version `{0}`")]
    NotFound(String),
}

/// Current version → endpoint table, swapped atomically.
#[derive(Debug)]
pub struct BackendRegistry {
    current: ArcSwap<Snapshot>,
}

impl BackendRegistry {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// A registry that routes nothing until the first snapshot arrives.
    pub fn empty() -> Self {
        Self::new(Snapshot::new())
    }

    /// The snapshot current at the time of the call.
    ///
    /// Stays valid and unchanged for as long as the caller holds it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Resolve `version` against the current snapshot.
    pub fn get(&self, version: &str) -> Result<Endpoint, RegistryError> {
        self.current
            .load()
            .resolve(version)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(version.to_string()))
    }

    /// Install `snapshot` in place of the current one.
    pub fn replace(&self, snapshot: Snapshot) {
        for (version, endpoint) in snapshot.sorted_entries() {
            tracing::info!(version = %version, endpoint = %endpoint, "Registry entry");
        }
        tracing::info!(entries = snapshot.len(), "Registry snapshot installed");
        metrics::record_registry_size(snapshot.len());

        self.current.store(Arc::new(snapshot));
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
