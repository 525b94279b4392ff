//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay flags and environment variables via clap)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared by reference with the dispatcher and discovery feed
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Configuration errors are fatal at startup, never at request time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{Cli, ConfigError};
pub use schema::ProxyConfig;
pub use schema::{DiscoveryConfig, DiscoveryMode, ListenerConfig, RepositoryConfig, TimeoutConfig};
