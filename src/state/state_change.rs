// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! Changes are produced by the session from connection events and decoded
//! `Main.Power=` lines, then applied to the receiver's
//! [`DeviceState`](super::DeviceState).
//!
//! # Examples
//!
//! ```
//! use nad_telnet::state::{DeviceState, StateChange};
//! use nad_telnet::types::PowerState;
//!
//! let mut state = DeviceState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::power(PowerState::On)));
//! assert!(!state.apply(&StateChange::power(PowerState::On)));
//! ```

use chrono::{DateTime, Utc};

use crate::types::PowerState;

/// Represents a change in receiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// The receiver reported its power state.
    Power {
        /// The reported state.
        state: PowerState,
        /// When the report was read.
        at: DateTime<Utc>,
    },
    /// A session was established.
    Connected,
    /// The session was lost or shut down.
    Disconnected,
}

impl StateChange {
    /// Creates a power report stamped with the current time.
    #[must_use]
    pub fn power(state: PowerState) -> Self {
        Self::Power {
            state,
            at: Utc::now(),
        }
    }
}
