// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical state of one receiver.

use chrono::{DateTime, Utc};

use crate::state::StateChange;
use crate::types::PowerState;

/// The last known state of a receiver.
///
/// Losing the connection does not reset `power`: it keeps the last value the
/// receiver reported until a new report arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceState {
    power: PowerState,
    last_updated: Option<DateTime<Utc>>,
    connected: bool,
}

impl DeviceState {
    /// Creates a disconnected state with unknown power.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last reported power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Returns when power was last reported.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Returns `true` while a session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Applies a change to this state.
    ///
    /// Returns `true` if an observable field changed. A repeated power report
    /// still refreshes `last_updated` but returns `false`.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match *change {
            StateChange::Power { state, at } => {
                self.last_updated = Some(at);
                if self.power == state {
                    false
                } else {
                    self.power = state;
                    true
                }
            }
            StateChange::Connected => !std::mem::replace(&mut self.connected, true),
            StateChange::Disconnected => std::mem::replace(&mut self.connected, false),
        }
    }
}
