// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the NAD Telnet library.
//!
//! The hierarchy follows the layers of the library: command construction,
//! line parsing, value validation, session communication and configuration.
//!
//! Not every error is fatal. A [`ParseError`] raised while reading the socket
//! only means the line is ignored, and a [`ProtocolError::ResponseTimeout`]
//! fails a single request while the session stays open.

use thiserror::Error;

use crate::command::Operation;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The command cannot be encoded. Retrying it unchanged will fail again.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// A received line could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A value failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Communication with the receiver failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configuration is invalid or could not be persisted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device was not found in the manager.
    #[error("device not found")]
    DeviceNotFound,
}

impl Error {
    /// Returns `true` if the request failed because no reply arrived in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::ResponseTimeout(_)))
    }

    /// Returns `true` if the request failed because the session went away.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Protocol(ProtocolError::ConnectionLost(_) | ProtocolError::NotConnected)
        )
    }
}

/// Errors raised when encoding a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A `Set` command was built without a value.
    #[error("{0} requires a value")]
    MissingValue(Operation),

    /// A query or step command was built with a value.
    #[error("{0} does not take a value")]
    UnexpectedValue(Operation),

    /// The zone or parameter name cannot be put on the wire.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// The value contains a line delimiter.
    #[error("invalid value: {0:?}")]
    InvalidValue(String),
}

/// Errors raised when decoding a line received from the receiver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line was empty after trimming.
    #[error("empty line")]
    Empty,

    /// The line has no `Zone.` prefix.
    #[error("missing zone separator in {0:?}")]
    MissingZone(String),

    /// The line has no operator after the parameter.
    #[error("missing operator in {0:?}")]
    MissingOperator(String),

    /// The zone or parameter is empty or malformed.
    #[error("malformed name in {0:?}")]
    MalformedName(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// An unknown platform command was provided.
    #[error("unknown power intent: {0}")]
    InvalidIntent(String),
}

/// Errors related to communication with the receiver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No matching reply arrived before the response timer fired.
    #[error("no response after {0} ms")]
    ResponseTimeout(u64),

    /// The socket failed or the session was torn down.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Establishing the TCP connection failed.
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectFailed {
        /// The endpoint that was dialed.
        endpoint: String,
        /// Why the attempt failed.
        reason: String,
    },

    /// There is currently no session to send on.
    #[error("receiver is not connected")]
    NotConnected,
}

/// Errors related to endpoint and device configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The endpoint was valid but nothing answered at setup time.
    #[error("receiver at {endpoint} is unreachable: {reason}")]
    Unreachable {
        /// The endpoint that was probed.
        endpoint: String,
        /// Why the probe failed.
        reason: String,
    },

    /// Reading or writing the configuration file failed.
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("configuration JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Browsing the network for receivers failed.
    #[error("discovery failed: {0}")]
    Discovery(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
