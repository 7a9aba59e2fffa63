// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The task that owns a receiver socket.
//!
//! One worker runs per session. It takes requests from the queue one at a
//! time, writes the command line and reads until the matching reply, the
//! response timer or a socket failure. Between requests it keeps reading so
//! unsolicited status lines are applied as they arrive.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::ProtocolError;
use crate::protocol::codec;
use crate::protocol::line_codec::TelnetLineCodec;
use crate::protocol::session::SessionEvent;
use crate::response::Response;
use crate::state::{StateCell, StateChange};
use crate::types::Endpoint;

/// A queued command awaiting its turn on the socket.
pub(crate) struct Request {
    pub(crate) command: Command,
    pub(crate) line: String,
    pub(crate) reply: oneshot::Sender<Result<Response, ProtocolError>>,
}

pub(crate) struct Worker {
    pub(crate) endpoint: Endpoint,
    pub(crate) reader: FramedRead<OwnedReadHalf, TelnetLineCodec>,
    pub(crate) writer: FramedWrite<OwnedWriteHalf, TelnetLineCodec>,
    pub(crate) requests: mpsc::Receiver<Request>,
    pub(crate) events: mpsc::UnboundedSender<SessionEvent>,
    pub(crate) state: StateCell,
    pub(crate) cancel: CancellationToken,
    pub(crate) response_timeout: Duration,
}

const SHUT_DOWN: &str = "session shut down";

impl Worker {
    pub(crate) async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break SHUT_DOWN.to_string(),
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        break "all session handles dropped".to_string();
                    };
                    if let Some(reason) = self.exchange(request).await {
                        break reason;
                    }
                }
                line = self.reader.next() => match line {
                    Some(Ok(line)) => {
                        self.handle_line(&line);
                    }
                    Some(Err(e)) => break format!("read failed: {e}"),
                    None => break "connection closed by receiver".to_string(),
                },
            }
        };
        self.close(reason);
    }

    /// Runs one request. Returns the loss reason if the socket is gone.
    async fn exchange(&mut self, request: Request) -> Option<String> {
        let Request {
            command,
            line,
            reply,
        } = request;

        if reply.is_closed() {
            tracing::debug!(endpoint = %self.endpoint, "Skipping abandoned request");
            return None;
        }

        let result = self.transact(&command, line).await;
        let lost = match &result {
            Err(ProtocolError::ConnectionLost(reason)) => Some(reason.clone()),
            _ => None,
        };
        if reply.send(result).is_err() {
            tracing::debug!(endpoint = %self.endpoint, "Caller went away before the reply");
        }
        lost
    }

    async fn transact(&mut self, command: &Command, line: String) -> Result<Response, ProtocolError> {
        tracing::debug!(endpoint = %self.endpoint, line = %line.trim_end(), "Sending command");

        self.writer
            .send(line)
            .await
            .map_err(|e| ProtocolError::ConnectionLost(format!("write failed: {e}")))?;

        let deadline = Instant::now() + self.response_timeout;
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(ProtocolError::ConnectionLost(SHUT_DOWN.to_string()));
                }
                () = tokio::time::sleep_until(deadline) => {
                    let timeout_ms = u64::try_from(self.response_timeout.as_millis()).unwrap_or(u64::MAX);
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        zone = command.zone(),
                        parameter = command.parameter(),
                        timeout_ms,
                        "No response from receiver"
                    );
                    let _ = self.events.send(SessionEvent::ResponseTimeout(command.clone()));
                    return Err(ProtocolError::ResponseTimeout(timeout_ms));
                }
                line = self.reader.next() => match line {
                    Some(Ok(line)) => {
                        if let Some(response) = self.handle_line(&line)
                            && command.is_answered_by(&response)
                        {
                            return Ok(response);
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ProtocolError::ConnectionLost(format!("read failed: {e}")));
                    }
                    None => {
                        return Err(ProtocolError::ConnectionLost(
                            "connection closed by receiver".to_string(),
                        ));
                    }
                },
            }
        }
    }

    /// Decodes a line and applies it to the device state if it reports power.
    fn handle_line(&self, line: &str) -> Option<Response> {
        let response = match codec::decode(line) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, line, error = %e, "Ignoring line");
                return None;
            }
        };
        tracing::debug!(endpoint = %self.endpoint, line, "Received line");

        if response.is_main_power() {
            match response.power_state() {
                Ok(power) => {
                    if self.state.apply(&StateChange::power(power)) {
                        tracing::info!(endpoint = %self.endpoint, power = %power, "Power state changed");
                    }
                }
                Err(e) => {
                    tracing::warn!(endpoint = %self.endpoint, error = %e, "Unexpected power value");
                }
            }
        }
        Some(response)
    }

    fn close(mut self, reason: String) {
        let requested = self.cancel.is_cancelled();
        self.cancel.cancel();
        self.state.apply(&StateChange::Disconnected);

        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            let _ = request
                .reply
                .send(Err(ProtocolError::ConnectionLost(reason.clone())));
        }

        if requested {
            tracing::info!(endpoint = %self.endpoint, "Session closed");
        } else {
            tracing::warn!(endpoint = %self.endpoint, reason = %reason, "Connection lost");
            let _ = self.events.send(SessionEvent::ConnectionLost(reason));
        }
    }
}
