// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host/port address pairs as they appear in configuration.

use std::fmt;

use thiserror::Error;

/// Default backend port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default sentinel port.
pub const DEFAULT_SENTINEL_PORT: u16 = 26379;

/// A backend endpoint address.
///
/// Ordered lexicographically (host first, then port) so address sets can
/// be compared independently of configuration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostAndPort {
    host: String,
    port: u16,
}

/// Failure to parse a textual address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty host in address \"{0}\"")]
    EmptyHost(String),

    #[error("invalid port in address \"{0}\"")]
    InvalidPort(String),

    #[error("ambiguous address \"{0}\", IPv6 hosts must be bracketed")]
    AmbiguousAddress(String),
}

impl HostAndPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// Parse `host`, `host:port`, `[v6addr]` or `[v6addr]:port`.
    ///
    /// A missing port falls back to `default_port`.
    pub fn parse(address: &str, default_port: u16) -> Result<Self, AddressError> {
        if let Some(rest) = address.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| AddressError::AmbiguousAddress(address.to_string()))?;
            if host.is_empty() {
                return Err(AddressError::EmptyHost(address.to_string()));
            }
            let port = match after.strip_prefix(':') {
                Some(port_str) => parse_port(port_str, address)?,
                None if after.is_empty() => default_port,
                None => return Err(AddressError::AmbiguousAddress(address.to_string())),
            };
            return Ok(Self::new(host, port));
        }

        match address.matches(':').count() {
            0 => {
                if address.is_empty() {
                    return Err(AddressError::EmptyHost(address.to_string()));
                }
                Ok(Self::new(address, default_port))
            }
            1 => {
                let (host, port_str) = address.split_once(':').unwrap_or((address, ""));
                if host.is_empty() {
                    return Err(AddressError::EmptyHost(address.to_string()));
                }
                Ok(Self::new(host, parse_port(port_str, address)?))
            }
            // Unbracketed IPv6: host/port boundary cannot be determined.
            _ => Err(AddressError::AmbiguousAddress(address.to_string())),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Same host, different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }
}

fn parse_port(port_str: &str, address: &str) -> Result<u16, AddressError> {
    port_str
        .parse::<u16>()
        .map_err(|_| AddressError::InvalidPort(address.to_string()))
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
#[path = "hostport_tests.rs"]
mod tests;
