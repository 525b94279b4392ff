//! Configuration loading from command line, environment and disk.
//!
//! Precedence: flag > environment variable > config file > default.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::schema::{DiscoveryMode, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line surface. Every flag can also be given as an environment variable.
#[derive(Debug, Default, Parser)]
#[command(name = "crserver-proxy", version)]
#[command(about = "Routes configuration repository calls to the server matching their version", long_about = None)]
pub struct Cli {
    /// Configuration Repository URL
    #[arg(short = 'u', long, env = "REPO_URL")]
    pub repo_url: Option<String>,

    /// Listen port
    #[arg(short = 'p', long, env = "LISTEN_PORT")]
    pub port: Option<u16>,

    /// RegExp to validate commit messages
    #[arg(short = 'r', long, env = "COMMIT_REGEXP")]
    pub commit_regexp: Option<String>,

    /// Backend discovery: auto, static or docker
    #[arg(long, env = "DISCOVERY")]
    pub discovery: Option<DiscoveryMode>,

    /// Container label selecting repository servers
    #[arg(long, env = "DISCOVERY_LABEL")]
    pub discovery_label: Option<String>,

    /// Port a repository server container must expose
    #[arg(long, env = "SERVICE_PORT")]
    pub service_port: Option<u16>,

    /// Seconds to wait before restarting discovery after a failure
    #[arg(long, env = "RETRY_INTERVAL_SECS")]
    pub retry_interval_secs: Option<u64>,

    /// Seconds to wait for a repository server response
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Optional TOML config file
    #[arg(short = 'c', long, env = "CRSERVER_PROXY_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Build the final, validated configuration.
    pub fn load(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);

        let docker_host = std::env::var("DOCKER_HOST").ok();
        config.discovery.mode = config.discovery.mode.resolve(docker_host.as_deref());

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Overlay every value given on the command line or in the environment.
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(url) = self.repo_url {
            config.repository.url = url;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(pattern) = self.commit_regexp {
            config.repository.commit_regexp = pattern;
        }
        if let Some(mode) = self.discovery {
            config.discovery.mode = mode;
        }
        if let Some(label) = self.discovery_label {
            config.discovery.label = label;
        }
        if let Some(port) = self.service_port {
            config.discovery.service_port = port;
        }
        if let Some(secs) = self.retry_interval_secs {
            config.discovery.retry_interval_secs = secs;
        }
        if let Some(secs) = self.upstream_timeout_secs {
            config.timeouts.upstream_secs = secs;
        }
        if let Some(address) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// Read a TOML config file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
