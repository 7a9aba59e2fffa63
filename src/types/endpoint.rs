// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network address of a receiver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Host and Telnet port identifying one receiver.
///
/// An endpoint is fixed for the lifetime of a session. Pointing at another
/// receiver means building a new supervisor.
///
/// # Examples
///
/// ```
/// use nad_telnet::types::Endpoint;
///
/// let endpoint: Endpoint = "192.168.1.20".parse().unwrap();
/// assert_eq!(endpoint.port(), 23);
///
/// let endpoint: Endpoint = "nad.local:2323".parse().unwrap();
/// assert_eq!(endpoint.host(), "nad.local");
/// assert_eq!(endpoint.to_string(), "nad.local:2323");
/// ```
///
/// Serialized as its `host:port` string. Deserializing goes through the same
/// validation as [`FromStr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Default NAD Telnet port.
    pub const DEFAULT_PORT: u16 = 23;

    /// Creates an endpoint after validating host and port.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` if the host is empty or contains
    /// whitespace, or if the port is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into().trim().to_string();
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidEndpoint(format!("invalid host {host:?}")));
        }
        if port == 0 {
            return Err(ConfigError::InvalidEndpoint("port must not be 0".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Creates an endpoint on the default Telnet port.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` if the host is invalid.
    pub fn with_default_port(host: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(host, Self::DEFAULT_PORT)
    }

    /// Returns the host name or IP address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the TCP port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("telnet://").unwrap_or(s);

        // Bracketed IPv6: [::1]:23
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| ConfigError::InvalidEndpoint(s.to_string()))?;
            return match tail.strip_prefix(':') {
                Some(port) => Self::new(host, parse_port(port)?),
                None if tail.is_empty() => Self::with_default_port(host),
                None => Err(ConfigError::InvalidEndpoint(s.to_string())),
            };
        }

        match s.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port.
            Some((host, _)) if host.contains(':') => Self::with_default_port(s),
            Some((host, port)) => Self::new(host, parse_port(port)?),
            None => Self::with_default_port(s),
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

fn parse_port(port: &str) -> Result<u16, ConfigError> {
    port.parse()
        .map_err(|_| ConfigError::InvalidEndpoint(format!("invalid port {port:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_only_uses_default_port() {
        let endpoint: Endpoint = "192.168.1.20".parse().unwrap();
        assert_eq!(endpoint.host(), "192.168.1.20");
        assert_eq!(endpoint.port(), Endpoint::DEFAULT_PORT);
    }

    #[test]
    fn parse_host_and_port() {
        let endpoint: Endpoint = "telnet://receiver.local:2323".parse().unwrap();
        assert_eq!(endpoint.host(), "receiver.local");
        assert_eq!(endpoint.port(), 2323);
    }

    #[test]
    fn parse_ipv6() {
        let bracketed: Endpoint = "[fe80::1]:24".parse().unwrap();
        assert_eq!(bracketed.host(), "fe80::1");
        assert_eq!(bracketed.port(), 24);
        assert_eq!(bracketed.to_string(), "[fe80::1]:24");

        let bare: Endpoint = "fe80::1".parse().unwrap();
        assert_eq!(bare.host(), "fe80::1");
        assert_eq!(bare.port(), 23);
    }

    #[test]
    fn reject_invalid_endpoints() {
        for input in ["", "   ", "host:", "host:abc", "host:0", "host:70000", "two words"] {
            assert!(
                matches!(input.parse::<Endpoint>(), Err(ConfigError::InvalidEndpoint(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        let endpoint = Endpoint::new("10.0.0.5", 23).unwrap();
        assert_eq!(endpoint.to_string(), "10.0.0.5:23");
        assert_eq!(endpoint.to_string().parse::<Endpoint>().unwrap(), endpoint);
    }

    #[test]
    fn serde_uses_validated_string_form() {
        let endpoint = Endpoint::new("fe80::1", 2323).unwrap();
        let json = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(json, r#""[fe80::1]:2323""#);
        assert_eq!(serde_json::from_str::<Endpoint>(&json).unwrap(), endpoint);
    }

    #[test]
    fn deserialize_rejects_invalid_endpoint() {
        for json in [r#""""#, r#""host:0""#, r#""two words""#, r#"{"host":"","port":0}"#] {
            assert!(
                serde_json::from_str::<Endpoint>(json).is_err(),
                "{json} should be rejected"
            );
        }
    }
}
