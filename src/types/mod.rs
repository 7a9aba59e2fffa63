// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for NAD receiver control.
//!
//! - [`PowerState`] - On/Off/Unknown power state of a zone
//! - [`Endpoint`] - Host and Telnet port of a receiver

mod endpoint;
mod power;

pub use endpoint::Endpoint;
pub use power::PowerState;
