//! Version-aware reverse proxy for 1C configuration repository servers.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod protocol;
pub mod registry;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::BackendRegistry;
