// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text encoding of NAD command lines.

use crate::command::{Command, Operation};
use crate::error::{CommandError, ParseError};
use crate::response::Response;

/// Line delimiter appended to every written command.
pub const LINE_DELIMITER: &str = "\r\n";

const OPERATORS: [char; 4] = ['?', '=', '+', '-'];

/// Encodes a command as a single wire line, delimiter included.
///
/// # Errors
///
/// Returns `CommandError` if the zone or parameter is empty or contains
/// whitespace or operator characters, if a `Set` has no value, if any other
/// operation has one, or if the value contains a line delimiter.
///
/// # Examples
///
/// ```
/// use nad_telnet::command::Command;
/// use nad_telnet::protocol::encode;
///
/// assert_eq!(encode(&Command::query("Main", "Power")).unwrap(), "Main.Power?\r\n");
/// assert_eq!(encode(&Command::set("Main", "Power", "On")).unwrap(), "Main.Power=On\r\n");
/// ```
pub fn encode(command: &Command) -> Result<String, CommandError> {
    validate_name(command.zone(), true)?;
    validate_name(command.parameter(), false)?;

    let operation = command.operation();
    let value = match (operation.takes_value(), command.value()) {
        (true, Some(value)) if !value.is_empty() => {
            if value.contains(['\r', '\n']) {
                return Err(CommandError::InvalidValue(value.to_string()));
            }
            value
        }
        (true, _) => return Err(CommandError::MissingValue(operation)),
        (false, Some(_)) => return Err(CommandError::UnexpectedValue(operation)),
        (false, None) => "",
    };

    Ok(format!(
        "{}.{}{}{}{}",
        command.zone(),
        command.parameter(),
        operation.token(),
        value,
        LINE_DELIMITER
    ))
}

fn validate_name(name: &str, is_zone: bool) -> Result<(), CommandError> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || OPERATORS.contains(&c))
        || (is_zone && name.contains('.'));
    if invalid {
        Err(CommandError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Decodes one line received from the receiver.
///
/// Surrounding whitespace and control characters are ignored. The line is
/// split at the first `.` and then at the first operator after it.
///
/// # Errors
///
/// Returns `ParseError` for lines without a `Zone.Parameter<op>` structure,
/// such as banners or blank keep-alives. Callers skip those lines.
///
/// # Examples
///
/// ```
/// use nad_telnet::command::Operation;
/// use nad_telnet::protocol::decode;
///
/// let response = decode("Main.Volume=-20\r").unwrap();
/// assert_eq!(response.parameter(), "Volume");
/// assert_eq!(response.operation(), Operation::Set);
/// assert_eq!(response.value(), "-20");
/// ```
pub fn decode(line: &str) -> Result<Response, ParseError> {
    let line = line.trim_matches(|c: char| c.is_whitespace() || c.is_control());
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (zone, rest) = line
        .split_once('.')
        .ok_or_else(|| ParseError::MissingZone(line.to_string()))?;
    let op_index = rest
        .find(OPERATORS)
        .ok_or_else(|| ParseError::MissingOperator(line.to_string()))?;

    let parameter = &rest[..op_index];
    let token = rest[op_index..].chars().next().and_then(Operation::from_token);
    let Some(operation) = token else {
        return Err(ParseError::MissingOperator(line.to_string()));
    };
    // Operators are ASCII, so the value starts one byte after the operator.
    let value = rest[op_index + 1..].trim();

    let well_formed = |name: &str| {
        !name.is_empty()
            && !name
                .chars()
                .any(|c| c.is_whitespace() || OPERATORS.contains(&c))
    };
    if !well_formed(zone) || !well_formed(parameter) {
        return Err(ParseError::MalformedName(line.to_string()));
    }

    Ok(Response::new(zone, parameter, operation, value))
}
