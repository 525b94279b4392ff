//! Backend endpoint addresses.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Port used when an endpoint does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Error type for endpoint parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint address is empty")]
    Empty,
    #[error("invalid port in endpoint `{0}`")]
    InvalidPort(String),
    #[error("invalid host in endpoint `{0}`")]
    InvalidHost(String),
}

/// A backend host with an optional explicit port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    /// Create an endpoint from a bare host (IP literal or DNS name).
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `ipv6` or `[ipv6]:port`.
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EndpointError::Empty);
        }

        if let Ok(addr) = input.parse::<SocketAddr>() {
            return Ok(Self::new(addr.ip().to_string(), Some(addr.port())));
        }
        if let Ok(ip) = input.parse::<IpAddr>() {
            return Ok(Self::new(ip.to_string(), None));
        }
        if let Some(inner) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return inner
                .parse::<IpAddr>()
                .map(|ip| Self::new(ip.to_string(), None))
                .map_err(|_| EndpointError::InvalidHost(input.to_string()));
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                if host.is_empty() {
                    return Err(EndpointError::InvalidHost(input.to_string()));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| EndpointError::InvalidPort(input.to_string()))?;
                Ok(Self::new(host, Some(port)))
            }
            Some(_) => Err(EndpointError::InvalidHost(input.to_string())),
            None => Ok(Self::new(input, None)),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host:port` for the outbound URL, with the default port filled in.
    pub fn authority(&self) -> String {
        let port = self.port.unwrap_or(DEFAULT_PORT);
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, port)
        } else {
            format!("{}:{}", self.host, port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(_) => f.write_str(&self.authority()),
            None => f.write_str(&self.host),
        }
    }
}
