// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NAD command definitions.
//!
//! A NAD command is a single text line addressing one parameter of one zone:
//!
//! | Operation | Token | Value | Example |
//! |-----------|-------|-------|---------|
//! | [`Operation::Query`] | `?` | none | `Main.Power?` |
//! | [`Operation::Set`] | `=` | required | `Main.Power=On` |
//! | [`Operation::Increment`] | `+` | none | `Main.Volume+` |
//! | [`Operation::Decrement`] | `-` | none | `Main.Volume-` |
//!
//! Commands are plain values. Validation happens when they are encoded, see
//! [`crate::protocol::encode`].
//!
//! # Examples
//!
//! ```
//! use nad_telnet::command::{Command, Operation, PowerCommand};
//! use nad_telnet::types::PowerState;
//!
//! let cmd = Command::query("Main", "Power");
//! assert_eq!(cmd.operation(), Operation::Query);
//!
//! let cmd: Command = PowerCommand::Set(PowerState::On).into();
//! assert_eq!(cmd.value(), Some("On"));
//! ```

mod power;

use std::fmt;

pub use power::PowerCommand;

use crate::response::Response;

/// The main zone of a NAD receiver.
pub const MAIN_ZONE: &str = "Main";

/// The power parameter.
pub const POWER: &str = "Power";

/// The operation requested by a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Ask for the current value (`?`).
    Query,
    /// Assign a value (`=`). Also the operator of every reply line.
    Set,
    /// Step the value up (`+`).
    Increment,
    /// Step the value down (`-`).
    Decrement,
}

impl Operation {
    /// Returns the operator character used on the wire.
    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Self::Query => '?',
            Self::Set => '=',
            Self::Increment => '+',
            Self::Decrement => '-',
        }
    }

    /// Maps an operator character back to an operation.
    #[must_use]
    pub const fn from_token(token: char) -> Option<Self> {
        match token {
            '?' => Some(Self::Query),
            '=' => Some(Self::Set),
            '+' => Some(Self::Increment),
            '-' => Some(Self::Decrement),
            _ => None,
        }
    }

    /// Returns `true` if this operation carries a value.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        matches!(self, Self::Set)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Query => "Query",
            Self::Set => "Set",
            Self::Increment => "Increment",
            Self::Decrement => "Decrement",
        };
        f.write_str(name)
    }
}

/// A command addressed to one zone parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    zone: String,
    parameter: String,
    operation: Operation,
    value: Option<String>,
}

impl Command {
    /// Creates a command from its parts.
    ///
    /// No validation is done here; [`crate::protocol::encode`] rejects
    /// combinations that cannot be put on the wire.
    #[must_use]
    pub fn new(
        zone: impl Into<String>,
        parameter: impl Into<String>,
        operation: Operation,
        value: Option<String>,
    ) -> Self {
        Self {
            zone: zone.into(),
            parameter: parameter.into(),
            operation,
            value,
        }
    }

    /// Creates a `Zone.Parameter?` query.
    #[must_use]
    pub fn query(zone: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(zone, parameter, Operation::Query, None)
    }

    /// Creates a `Zone.Parameter=Value` assignment.
    #[must_use]
    pub fn set(
        zone: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(zone, parameter, Operation::Set, Some(value.into()))
    }

    /// Creates a `Zone.Parameter+` step.
    #[must_use]
    pub fn increment(zone: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(zone, parameter, Operation::Increment, None)
    }

    /// Creates a `Zone.Parameter-` step.
    #[must_use]
    pub fn decrement(zone: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(zone, parameter, Operation::Decrement, None)
    }

    /// Returns the zone name.
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Returns the operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns `true` if `response` resolves this command.
    ///
    /// The receiver answers every operation with a `Zone.Parameter=Value`
    /// line for the same zone and parameter. Names compare case-insensitively.
    #[must_use]
    pub fn is_answered_by(&self, response: &Response) -> bool {
        response.operation() == Operation::Set
            && response.zone().eq_ignore_ascii_case(&self.zone)
            && response.parameter().eq_ignore_ascii_case(&self.parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_tokens_round_trip() {
        for op in [
            Operation::Query,
            Operation::Set,
            Operation::Increment,
            Operation::Decrement,
        ] {
            assert_eq!(Operation::from_token(op.token()), Some(op));
        }
        assert_eq!(Operation::from_token('.'), None);
    }

    #[test]
    fn only_set_takes_value() {
        assert!(Operation::Set.takes_value());
        assert!(!Operation::Query.takes_value());
        assert!(!Operation::Increment.takes_value());
        assert!(!Operation::Decrement.takes_value());
    }

    #[test]
    fn constructors() {
        let cmd = Command::set(MAIN_ZONE, "Volume", "-20");
        assert_eq!(cmd.zone(), "Main");
        assert_eq!(cmd.parameter(), "Volume");
        assert_eq!(cmd.operation(), Operation::Set);
        assert_eq!(cmd.value(), Some("-20"));

        assert_eq!(Command::increment("Zone2", "Volume").operation(), Operation::Increment);
        assert_eq!(Command::decrement("Zone2", "Volume").value(), None);
    }

    #[test]
    fn answered_by_matching_reply_only() {
        let cmd = Command::query(MAIN_ZONE, POWER);

        let reply = Response::new("main", "POWER", Operation::Set, "On");
        assert!(cmd.is_answered_by(&reply));

        let other_param = Response::new("Main", "Volume", Operation::Set, "-20");
        assert!(!cmd.is_answered_by(&other_param));

        let other_zone = Response::new("Zone2", "Power", Operation::Set, "On");
        assert!(!cmd.is_answered_by(&other_zone));

        let echo_query = Response::new("Main", "Power", Operation::Query, "");
        assert!(!cmd.is_answered_by(&echo_query));
    }
}
