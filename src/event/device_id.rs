// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Endpoint;

/// Identifier of a configured receiver.
///
/// Identifiers are derived from the receiver's host so the same receiver
/// keeps its identity across restarts and re-configuration.
///
/// # Examples
///
/// ```
/// use nad_telnet::event::DeviceId;
///
/// let id = DeviceId::for_host("192.168.1.10");
/// assert_eq!(id.as_str(), "nad_192_168_1_10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the identifier of the receiver at `host`.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        let slug: String = host
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        Self(format!("nad_{slug}"))
    }

    /// Derives the identifier of the receiver at `endpoint`.
    #[must_use]
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        Self::for_host(endpoint.host())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
