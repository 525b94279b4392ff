//! Outbound URL construction.
//!
//! A forwarded call goes to
//! `http://<endpoint host>:<port or 80><repository base path><original path and query>`.

use axum::http::uri::{InvalidUri, PathAndQuery};
use axum::http::Uri;
use url::{Host, Url};

use crate::registry::Endpoint;

/// Error type for repository URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme `{0}`, only http is proxied")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// The configured repository URL, split into the parts used for forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamBase {
    base_path: String,
    endpoint: Endpoint,
}

impl UpstreamBase {
    pub fn parse(input: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(input.trim())?;
        if url.scheme() != "http" {
            return Err(UpstreamError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(UpstreamError::MissingHost),
        };

        Ok(Self {
            base_path: url.path().trim_end_matches('/').to_string(),
            endpoint: Endpoint::new(host, url.port()),
        })
    }

    /// Path prefix prepended to every forwarded request (no trailing slash).
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Host of the repository URL itself; the single backend in static mode.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Absolute URI of the forwarded request on `endpoint`.
    pub fn forward_uri(
        &self,
        endpoint: &Endpoint,
        original: Option<&PathAndQuery>,
    ) -> Result<Uri, InvalidUri> {
        let path_and_query = original.map(PathAndQuery::as_str).unwrap_or("/");
        Uri::try_from(format!(
            "http://{}{}{}",
            endpoint.authority(),
            self.base_path,
            path_and_query
        ))
    }
}
