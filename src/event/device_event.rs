// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events published by the receiver manager.

use super::DeviceId;
use crate::supervisor::ConnectionState;
use crate::types::PowerState;

/// An event about one managed receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A receiver was added to the manager.
    DeviceAdded {
        /// The ID of the added receiver.
        device_id: DeviceId,
    },

    /// A receiver was removed from the manager.
    DeviceRemoved {
        /// The ID of the removed receiver.
        device_id: DeviceId,
    },

    /// The connection state of a receiver changed.
    ConnectionChanged {
        /// The ID of the receiver.
        device_id: DeviceId,
        /// The new connection state.
        state: ConnectionState,
    },

    /// A receiver reported a new power state.
    PowerChanged {
        /// The ID of the receiver.
        device_id: DeviceId,
        /// The reported power state.
        power: PowerState,
    },
}

impl DeviceEvent {
    /// Returns the receiver ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::DeviceAdded { device_id }
            | Self::DeviceRemoved { device_id }
            | Self::ConnectionChanged { device_id, .. }
            | Self::PowerChanged { device_id, .. } => device_id,
        }
    }

    /// Returns `true` if this is a lifecycle event (added/removed).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::DeviceAdded { .. } | Self::DeviceRemoved { .. })
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }
}
