// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver state management types.
//!
//! The [`DeviceState`] struct holds the last known state of a receiver,
//! [`StateChange`] represents individual changes that can be applied, and
//! [`StateCell`] shares one state between the session that writes it and
//! the components that observe it.
//!
//! # Examples
//!
//! ```
//! use nad_telnet::state::{DeviceState, StateChange};
//! use nad_telnet::types::PowerState;
//!
//! let mut state = DeviceState::new();
//! state.apply(&StateChange::power(PowerState::On));
//!
//! assert_eq!(state.power(), PowerState::On);
//! ```

mod cell;
mod device_state;
mod state_change;

pub use cell::StateCell;
pub use device_state::DeviceState;
pub use state_change::StateChange;
