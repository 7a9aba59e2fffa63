// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Management of several NAD receivers.
//!
//! The [`ReceiverManager`] is what a platform driver sits on:
//!
//! - **Setup**: validate and probe a user-supplied endpoint, then persist it
//! - **Startup**: start every enabled receiver from `devices.json`
//! - **Commands**: route platform intents to the receiver's controller
//! - **Events**: one broadcast channel for all receivers
//! - **Standby**: force all receivers to reconnect when the host wakes up

mod managed_receiver;
mod receiver_manager;

pub use receiver_manager::ReceiverManager;
