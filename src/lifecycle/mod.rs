//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Populate registry (static or discovery) → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop discovery → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Runtime errors never end the process; only a signal does

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start_discovery, start_feed, StartupError};
