// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power commands for the main zone.

use crate::command::{Command, MAIN_ZONE, POWER};
use crate::types::PowerState;

/// Typed power command for the main zone.
///
/// # Examples
///
/// ```
/// use nad_telnet::command::{Command, Operation, PowerCommand};
/// use nad_telnet::types::PowerState;
///
/// let cmd: Command = PowerCommand::Get.into();
/// assert_eq!(cmd.operation(), Operation::Query);
///
/// let cmd: Command = PowerCommand::off().into();
/// assert_eq!(cmd.value(), Some("Off"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Query the current power state (`Main.Power?`).
    Get,
    /// Set the power state (`Main.Power=On`).
    Set(PowerState),
}

impl PowerCommand {
    /// Creates a command to turn the receiver on.
    #[must_use]
    pub const fn on() -> Self {
        Self::Set(PowerState::On)
    }

    /// Creates a command to put the receiver in standby.
    #[must_use]
    pub const fn off() -> Self {
        Self::Set(PowerState::Off)
    }
}

impl From<PowerCommand> for Command {
    fn from(cmd: PowerCommand) -> Self {
        match cmd {
            PowerCommand::Get => Command::query(MAIN_ZONE, POWER),
            // Unknown is rejected by the session before it gets here; encoding
            // it would still produce a well-formed line the receiver ignores.
            PowerCommand::Set(state) => Command::set(MAIN_ZONE, POWER, state.as_str()),
        }
    }
}
