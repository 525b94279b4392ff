//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Repository server location and commit policy.
    pub repository: RepositoryConfig,

    /// How the version → backend table is populated.
    pub discovery: DiscoveryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string passed to the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Repository server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the repository server (e.g., "http://crserver/repo").
    ///
    /// Its path is the base path of every forwarded request; in static mode
    /// its host is also the only backend.
    pub url: String,

    /// Pattern commit comments must match (case-insensitive).
    pub commit_regexp: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            commit_regexp: ".*".to_string(),
        }
    }
}

/// Backend discovery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Docker when `DOCKER_HOST` is set, static otherwise.
    #[default]
    Auto,
    /// Route every version to the repository URL host.
    Static,
    /// Follow labelled containers on the Docker engine.
    Docker,
}

impl DiscoveryMode {
    /// Resolve `Auto` against the value of `DOCKER_HOST`.
    pub fn resolve(self, docker_host: Option<&str>) -> Self {
        match self {
            Self::Auto => match docker_host {
                Some(host) if !host.trim().is_empty() => Self::Docker,
                _ => Self::Static,
            },
            other => other,
        }
    }
}

impl std::str::FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "static" => Ok(Self::Static),
            "docker" => Ok(Self::Docker),
            other => Err(format!("unknown discovery mode `{}` (expected auto, static or docker)", other)),
        }
    }
}

/// Discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Discovery mode.
    pub mode: DiscoveryMode,

    /// Container label that marks repository server instances.
    pub label: String,

    /// Port a backend must expose to be routable.
    pub service_port: u16,

    /// Fixed delay before the discovery feed is restarted after a failure.
    pub retry_interval_secs: u64,
}

impl DiscoveryConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Auto,
            label: "crserver".to_string(),
            service_port: 80,
            retry_interval_secs: 2,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on one whole backend exchange, response body included,
    /// in seconds. Large configuration uploads take many minutes.
    pub upstream_secs: u64,
}

impl TimeoutConfig {
    pub fn upstream(&self) -> Duration {
        Duration::from_secs(self.upstream_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 1200,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
