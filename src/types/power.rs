// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state of a NAD receiver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Represents the power state of a receiver zone.
///
/// `Unknown` is only ever a cached state: it cannot be sent to the receiver
/// and is never produced by parsing.
///
/// # Examples
///
/// ```
/// use nad_telnet::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "On");
/// assert_eq!("OFF".parse::<PowerState>().unwrap(), PowerState::Off);
/// assert_eq!(PowerState::On.toggled(), PowerState::Off);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// Power is off (standby).
    Off,
    /// Power is on.
    On,
    /// No report has been received yet.
    #[default]
    Unknown,
}

impl PowerState {
    /// Returns the canonical protocol token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns `true` if the state is a concrete `On` or `Off`.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns the opposite state. `Unknown` stays `Unknown`.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if token.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Err(ValueError::InvalidPowerState(s.to_string()))
        }
    }
}
