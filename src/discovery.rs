// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finding receivers on the local network.
//!
//! NAD receivers with BluOS announce a `_musc._tcp` service over mDNS. The
//! announced port belongs to BluOS, so candidates always use the Telnet
//! port 23.
//!
//! # Examples
//!
//! ```no_run
//! use nad_telnet::discovery::{self, DEFAULT_BROWSE_TIME};
//! use nad_telnet::manager::ReceiverManager;
//!
//! #[tokio::main]
//! async fn main() -> nad_telnet::Result<()> {
//!     let manager = ReceiverManager::new();
//!     for receiver in discovery::discover(DEFAULT_BROWSE_TIME).await? {
//!         println!("found {} at {}", receiver.name, receiver.address);
//!         manager.configure_discovered(&receiver).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Endpoint;

/// mDNS service type announced by BluOS receivers.
pub const SERVICE_TYPE: &str = "_musc._tcp.local.";

/// How long [`discover`] browses when the caller has no preference.
pub const DEFAULT_BROWSE_TIME: Duration = Duration::from_secs(5);

/// A receiver found on the network, ready for
/// [`ReceiverManager::configure_discovered`](crate::manager::ReceiverManager::configure_discovered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredReceiver {
    /// Display name built from the announced service name and model.
    pub name: String,
    /// IP address of the receiver.
    pub address: String,
    /// Telnet port.
    pub port: u16,
}

impl DiscoveredReceiver {
    /// Returns the endpoint of the receiver.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` if the address is invalid.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::new(self.address.clone(), self.port)
    }
}

/// Browses the network for `browse_time` and returns every receiver found.
///
/// Receivers answering on several interfaces are reported once per address
/// and port.
///
/// # Errors
///
/// Returns `ConfigError::Discovery` if the mDNS daemon cannot be started.
pub async fn discover(browse_time: Duration) -> Result<Vec<DiscoveredReceiver>, ConfigError> {
    let daemon = ServiceDaemon::new().map_err(|e| ConfigError::Discovery(e.to_string()))?;
    let events = daemon
        .browse(SERVICE_TYPE)
        .map_err(|e| ConfigError::Discovery(e.to_string()))?;
    tracing::info!(service = SERVICE_TYPE, ?browse_time, "Browsing for receivers");

    let deadline = tokio::time::Instant::now() + browse_time;
    let mut found = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, events.recv_async()).await {
        let ServiceEvent::ServiceResolved(info) = event else {
            continue;
        };
        match candidate(&info) {
            Some(receiver) => {
                if merge(&mut found, receiver.clone()) {
                    tracing::info!(name = %receiver.name, address = %receiver.address, "Found receiver");
                }
            }
            None => {
                tracing::warn!(service = info.get_fullname(), "Service has no IP address");
            }
        }
    }

    if let Err(e) = daemon.stop_browse(SERVICE_TYPE) {
        tracing::debug!(error = %e, "Failed to stop browsing");
    }
    if let Err(e) = daemon.shutdown() {
        tracing::debug!(error = %e, "Failed to shut down mDNS daemon");
    }

    tracing::info!(count = found.len(), "Discovery finished");
    Ok(found)
}

/// Builds the display name of a receiver from its mDNS instance name.
///
/// The service type suffix is stripped and dots become spaces. The model is
/// prepended unless the name already mentions it, and the result is marked
/// as a remote.
///
/// # Examples
///
/// ```
/// use nad_telnet::discovery::display_name;
///
/// assert_eq!(
///     display_name("Living Room._musc._tcp.local.", Some("C 658")),
///     "C 658 - Living Room Remote"
/// );
/// ```
#[must_use]
pub fn display_name(fullname: &str, model: Option<&str>) -> String {
    let instance = fullname
        .strip_suffix(SERVICE_TYPE)
        .map_or(fullname, |rest| rest.strip_suffix('.').unwrap_or(rest));
    let mut name = instance.replace('.', " ").trim().to_string();
    if name.is_empty() {
        name = "NAD".to_string();
    }

    if let Some(model) = model.map(str::trim)
        && !model.is_empty()
        && !name.contains(model)
    {
        name = format!("{model} - {name}");
    }
    format!("{name} Remote")
}

fn candidate(info: &ServiceInfo) -> Option<DiscoveredReceiver> {
    let address = info
        .get_addresses()
        .iter()
        .filter(|ip| ip.is_ipv4())
        .min()
        .or_else(|| info.get_addresses().iter().min())
        .map(IpAddr::to_string)?;

    Some(DiscoveredReceiver {
        name: display_name(info.get_fullname(), info.get_property_val_str("model")),
        address,
        port: Endpoint::DEFAULT_PORT,
    })
}

/// Adds `receiver` unless one at the same address and port is known.
fn merge(found: &mut Vec<DiscoveredReceiver>, receiver: DiscoveredReceiver) -> bool {
    if found
        .iter()
        .any(|known| known.address == receiver.address && known.port == receiver.port)
    {
        return false;
    }
    found.push(receiver);
    true
}
