// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types shared with the remote-control platform.
//!
//! The platform talks in entity commands (`on`, `off`, `toggle` and the
//! `POWER_*` simple commands), entity states and status codes. This module
//! maps those onto the receiver model.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ProtocolError, Result, ValueError};
use crate::state::DeviceState;
use crate::types::PowerState;

/// A power command issued by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerIntent {
    /// Turn the receiver on.
    TurnOn,
    /// Put the receiver in standby.
    TurnOff,
    /// Flip the current state.
    Toggle,
}

impl PowerIntent {
    /// Returns the platform command name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TurnOn => "on",
            Self::TurnOff => "off",
            Self::Toggle => "toggle",
        }
    }
}

impl fmt::Display for PowerIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerIntent {
    type Err = ValueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "power_on" => Ok(Self::TurnOn),
            "off" | "power_off" => Ok(Self::TurnOff),
            "toggle" | "power_toggle" => Ok(Self::Toggle),
            _ => Err(ValueError::InvalidIntent(s.to_string())),
        }
    }
}

/// Entity state as shown by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityState {
    /// The receiver is on.
    On,
    /// The receiver is in standby.
    Off,
    /// Connected, but no power report yet.
    #[default]
    Unknown,
    /// No session to the receiver.
    Unavailable,
}

impl EntityState {
    /// Returns the platform state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unknown => "UNKNOWN",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl From<PowerState> for EntityState {
    fn from(power: PowerState) -> Self {
        match power {
            PowerState::On => Self::On,
            PowerState::Off => Self::Off,
            PowerState::Unknown => Self::Unknown,
        }
    }
}

impl From<&DeviceState> for EntityState {
    fn from(state: &DeviceState) -> Self {
        if state.is_connected() {
            state.power().into()
        } else {
            Self::Unavailable
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a platform command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// The command succeeded.
    Ok,
    /// The command was malformed or named an unknown device.
    BadRequest,
    /// The receiver did not answer in time.
    Timeout,
    /// The receiver is not connected.
    ServiceUnavailable,
    /// Anything else.
    ServerError,
}

impl CommandStatus {
    /// Maps a command result to a status.
    #[must_use]
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(e) => Self::from_error(e),
        }
    }

    /// Maps an error to a status.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidCommand(_) | Error::Value(_) | Error::DeviceNotFound => Self::BadRequest,
            Error::Protocol(ProtocolError::ResponseTimeout(_)) => Self::Timeout,
            Error::Protocol(
                ProtocolError::ConnectionLost(_)
                | ProtocolError::NotConnected
                | ProtocolError::ConnectFailed { .. },
            ) => Self::ServiceUnavailable,
            Error::Parse(_) | Error::Config(_) => Self::ServerError,
        }
    }

    /// Returns the HTTP-style status code the platform expects.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Timeout => 408,
            Self::ServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }
}

/// An entity the platform can command and observe.
#[allow(async_fn_in_trait)]
pub trait Entity {
    /// Executes a platform command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be carried out. The entity
    /// state is left unchanged in that case.
    async fn on_command(&self, intent: PowerIntent) -> Result<()>;

    /// Reconciles the entity with a new receiver state.
    fn on_state_change(&self, state: &DeviceState);

    /// Returns the current entity state.
    fn entity_state(&self) -> EntityState;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateChange;

    #[test]
    fn intent_from_platform_names() {
        assert_eq!("on".parse::<PowerIntent>().unwrap(), PowerIntent::TurnOn);
        assert_eq!("OFF".parse::<PowerIntent>().unwrap(), PowerIntent::TurnOff);
        assert_eq!("toggle".parse::<PowerIntent>().unwrap(), PowerIntent::Toggle);
        assert_eq!("POWER_ON".parse::<PowerIntent>().unwrap(), PowerIntent::TurnOn);
        assert_eq!("POWER_OFF".parse::<PowerIntent>().unwrap(), PowerIntent::TurnOff);
        assert_eq!(
            "POWER_TOGGLE".parse::<PowerIntent>().unwrap(),
            PowerIntent::Toggle
        );
        assert!(matches!(
            "VOLUME_UP".parse::<PowerIntent>(),
            Err(ValueError::InvalidIntent(_))
        ));
    }

    #[test]
    fn entity_state_from_device_state() {
        let mut state = DeviceState::new();
        assert_eq!(EntityState::from(&state), EntityState::Unavailable);

        state.apply(&StateChange::Connected);
        assert_eq!(EntityState::from(&state), EntityState::Unknown);

        state.apply(&StateChange::power(PowerState::On));
        assert_eq!(EntityState::from(&state), EntityState::On);

        state.apply(&StateChange::Disconnected);
        assert_eq!(EntityState::from(&state), EntityState::Unavailable);
    }

    #[test]
    fn status_from_errors() {
        assert_eq!(CommandStatus::from_result(&Ok(())), CommandStatus::Ok);

        let timeout = Err(ProtocolError::ResponseTimeout(3000).into());
        assert_eq!(CommandStatus::from_result(&timeout), CommandStatus::Timeout);

        let lost = Err(ProtocolError::ConnectionLost("reset".into()).into());
        assert_eq!(
            CommandStatus::from_result(&lost),
            CommandStatus::ServiceUnavailable
        );

        let bad = Err(ValueError::InvalidIntent("x".into()).into());
        assert_eq!(CommandStatus::from_result(&bad), CommandStatus::BadRequest);
        assert_eq!(CommandStatus::ServiceUnavailable.code(), 503);
    }
}
