// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded receiver lines.
//!
//! A [`Response`] is produced by [`crate::protocol::decode`] for every line
//! the receiver sends: replies to queries, echoes of assignments and
//! unsolicited status pushes all share the `Zone.Parameter=Value` shape.

use crate::command::{MAIN_ZONE, Operation, POWER};
use crate::error::ParseError;
use crate::types::PowerState;

/// One decoded line from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    zone: String,
    parameter: String,
    operation: Operation,
    value: String,
}

impl Response {
    /// Creates a response from its parts.
    #[must_use]
    pub fn new(
        zone: impl Into<String>,
        parameter: impl Into<String>,
        operation: Operation,
        value: impl Into<String>,
    ) -> Self {
        Self {
            zone: zone.into(),
            parameter: parameter.into(),
            operation,
            value: value.into(),
        }
    }

    /// Returns the zone name as received.
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Returns the parameter name as received.
    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Returns the parsed operator.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the value, empty when the line carried none.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns `true` for a `Main.Power=` report.
    #[must_use]
    pub fn is_main_power(&self) -> bool {
        self.operation == Operation::Set
            && self.zone.eq_ignore_ascii_case(MAIN_ZONE)
            && self.parameter.eq_ignore_ascii_case(POWER)
    }

    /// Interprets the value as a power state.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidValue` if the value is not `On` or `Off`
    /// in any casing.
    pub fn power_state(&self) -> Result<PowerState, ParseError> {
        self.value
            .parse()
            .map_err(|e: crate::error::ValueError| ParseError::InvalidValue {
                field: self.parameter.clone(),
                message: e.to_string(),
            })
    }
}
