//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the repository URL and commit pattern compile
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::http::policy::CommentPolicy;
use crate::http::upstream::UpstreamBase;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("repository URL is not set (use --repo-url or REPO_URL)")]
    MissingRepositoryUrl,
    #[error("invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),
    #[error("invalid commit regexp: {0}")]
    InvalidCommitRegexp(String),
    #[error("listen port must not be 0")]
    ZeroListenPort,
    #[error("discovery service port must not be 0")]
    ZeroServicePort,
    #[error("discovery label must not be empty")]
    EmptyDiscoveryLabel,
    #[error("{0} must be greater than 0")]
    ZeroDuration(&'static str),
    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.repository.url.trim().is_empty() {
        errors.push(ValidationError::MissingRepositoryUrl);
    } else if let Err(e) = UpstreamBase::parse(&config.repository.url) {
        errors.push(ValidationError::InvalidRepositoryUrl(e.to_string()));
    }

    if let Err(e) = CommentPolicy::new(&config.repository.commit_regexp) {
        errors.push(ValidationError::InvalidCommitRegexp(e.to_string()));
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroListenPort);
    }
    if config.discovery.service_port == 0 {
        errors.push(ValidationError::ZeroServicePort);
    }
    if config.discovery.label.trim().is_empty() {
        errors.push(ValidationError::EmptyDiscoveryLabel);
    }
    if config.discovery.retry_interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("discovery.retry_interval_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.upstream_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
