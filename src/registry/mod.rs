//! Backend registry subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery feed / static config
//!     → snapshot.rs (build a complete version → endpoint map)
//!     → store.rs (atomic swap of Arc<Snapshot>)
//!
//! Dispatcher:
//!     store.rs (load current Arc<Snapshot>)
//!     → exact version match, else "*" wildcard, else NotFound
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once installed; every update is a full swap
//! - Readers hold an `Arc<Snapshot>` for the whole request, so a concurrent
//!   swap never shows them a mixed mapping
//! - No history: the previous snapshot is dropped when its last reader is done

pub mod endpoint;
pub mod snapshot;
pub mod store;

pub use endpoint::{Endpoint, EndpointError, DEFAULT_PORT};
pub use snapshot::{Snapshot, WILDCARD};
pub use store::{BackendRegistry, RegistryError};
