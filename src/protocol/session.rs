// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telnet session with one NAD receiver.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::command::{Command, MAIN_ZONE, PowerCommand};
use crate::error::{ProtocolError, Result, ValueError};
use crate::protocol::PowerLink;
use crate::protocol::codec;
use crate::protocol::line_codec::TelnetLineCodec;
use crate::protocol::worker::{Request, Worker};
use crate::response::Response;
use crate::state::{StateCell, StateChange};
use crate::types::{Endpoint, PowerState};

/// Timeouts and limits for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    response_timeout: Duration,
    connect_timeout: Duration,
    queue_depth: usize,
}

impl SessionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long a request waits for its reply.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets how long establishing the TCP connection may take.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how many requests may wait behind the one in flight.
    #[must_use]
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Returns the response timeout.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the request queue depth.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(5),
            queue_depth: 32,
        }
    }
}

/// Notifications from a session to whoever supervises it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request got no reply in time. The session is still open.
    ResponseTimeout(Command),
    /// The socket failed. The session is closed.
    ConnectionLost(String),
}

/// Handle to an open Telnet session.
///
/// The socket is owned by a background task that runs one request at a
/// time. Concurrent callers queue in submission order. Cloning the handle is
/// cheap and shares the same session.
///
/// # Examples
///
/// ```no_run
/// use nad_telnet::protocol::{Session, SessionConfig};
/// use nad_telnet::state::StateCell;
///
/// # async fn example() -> nad_telnet::Result<()> {
/// let endpoint = "192.168.1.20".parse()?;
/// let (session, _events) =
///     Session::connect(endpoint, &SessionConfig::default(), StateCell::new()).await?;
///
/// let power = session.refresh_power().await?;
/// println!("Receiver is {power}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    endpoint: Endpoint,
    requests: mpsc::Sender<Request>,
    state: StateCell,
    cancel: CancellationToken,
}

impl Session {
    /// Opens a session and re-queries the power state.
    ///
    /// The returned receiver yields [`SessionEvent`]s until the session ends.
    /// A power query that times out is only logged, the session is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectFailed` if the TCP connection cannot be
    /// established within the connect timeout, or `ProtocolError::ConnectionLost`
    /// if the receiver drops the connection during the initial query.
    pub async fn connect(
        endpoint: Endpoint,
        config: &SessionConfig,
        state: StateCell,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        tracing::debug!(endpoint = %endpoint, "Connecting to receiver");

        let connect = TcpStream::connect((endpoint.host(), endpoint.port()));
        let stream = match tokio::time::timeout(config.connect_timeout(), connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProtocolError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
            Err(_) => {
                return Err(ProtocolError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: format!("timed out after {:?}", config.connect_timeout()),
                }
                .into());
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(endpoint = %endpoint, error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let (requests_tx, requests_rx) = mpsc::channel(config.queue_depth());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        state.apply(&StateChange::Connected);
        tracing::info!(endpoint = %endpoint, "Connected to receiver");

        let worker = Worker {
            endpoint: endpoint.clone(),
            reader: FramedRead::new(read_half, TelnetLineCodec::new()),
            writer: FramedWrite::new(write_half, TelnetLineCodec::new()),
            requests: requests_rx,
            events: events_tx,
            state: state.clone(),
            cancel: cancel.clone(),
            response_timeout: config.response_timeout(),
        };
        tokio::spawn(worker.run());

        let session = Self {
            endpoint,
            requests: requests_tx,
            state,
            cancel,
        };

        match session.refresh_power().await {
            Ok(power) => {
                tracing::debug!(endpoint = %session.endpoint, power = %power, "Initial power query");
            }
            Err(e) if e.is_connection_lost() => {
                session.shutdown();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(endpoint = %session.endpoint, error = %e, "Initial power query failed");
            }
        }

        Ok((session, events_rx))
    }

    /// Returns the endpoint this session is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the state cell this session writes to.
    #[must_use]
    pub fn state(&self) -> &StateCell {
        &self.state
    }

    /// Returns `true` once the session has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.requests.is_closed()
    }

    // ========== Requests ==========

    /// Sends a command and waits for the matching reply.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCommand` if the command cannot be encoded,
    /// `ProtocolError::ResponseTimeout` if no reply arrives in time, or
    /// `ProtocolError::ConnectionLost` if the session ends first.
    pub async fn send(&self, command: Command) -> Result<Response> {
        let line = codec::encode(&command)?;
        let (reply_tx, reply_rx) = oneshot::channel();

        self.requests
            .send(Request {
                command,
                line,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProtocolError::ConnectionLost("session closed".to_string()))?;

        let result = reply_rx
            .await
            .map_err(|_| ProtocolError::ConnectionLost("session closed".to_string()))?;
        Ok(result?)
    }

    /// Queries a main-zone parameter.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn query(&self, parameter: &str) -> Result<Response> {
        self.send(Command::query(MAIN_ZONE, parameter)).await
    }

    /// Sets a main-zone parameter and waits for the echo.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn set(&self, parameter: &str, value: &str) -> Result<Response> {
        self.send(Command::set(MAIN_ZONE, parameter, value)).await
    }

    // ========== Power ==========

    /// Returns the cached power state without touching the socket.
    #[must_use]
    pub fn get_power(&self) -> PowerState {
        self.state.snapshot().power()
    }

    /// Queries `Main.Power?` and returns the reported state.
    ///
    /// # Errors
    ///
    /// See [`Session::send`]. Also returns `Error::Parse` if the receiver
    /// reports a value other than `On` or `Off`.
    pub async fn refresh_power(&self) -> Result<PowerState> {
        let response = self.send(PowerCommand::Get.into()).await?;
        Ok(response.power_state()?)
    }

    /// Sets `Main.Power` and returns the state the receiver echoed.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidPowerState` for `PowerState::Unknown`,
    /// otherwise see [`Session::refresh_power`].
    pub async fn set_power(&self, power: PowerState) -> Result<PowerState> {
        if !power.is_known() {
            return Err(ValueError::InvalidPowerState(power.to_string()).into());
        }
        let response = self.send(PowerCommand::Set(power).into()).await?;
        Ok(response.power_state()?)
    }

    /// Closes the session. Queued and in-flight requests fail with
    /// `ConnectionLost`.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl PowerLink for Session {
    fn power(&self) -> PowerState {
        self.get_power()
    }

    async fn refresh_power(&self) -> Result<PowerState> {
        Session::refresh_power(self).await
    }

    async fn set_power(&self, power: PowerState) -> Result<PowerState> {
        Session::set_power(self, power).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.response_timeout(), Duration::from_secs(3));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.queue_depth(), 32);
    }

    #[test]
    fn session_config_builder() {
        let config = SessionConfig::new()
            .with_response_timeout(Duration::from_millis(250))
            .with_connect_timeout(Duration::from_secs(1))
            .with_queue_depth(0);
        assert_eq!(config.response_timeout(), Duration::from_millis(250));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.queue_depth(), 1);
    }

    #[tokio::test]
    async fn connect_refused_is_connect_failed() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::new("127.0.0.1", port).unwrap();
        let state = StateCell::new();
        let err = Session::connect(endpoint, &SessionConfig::default(), state.clone())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Protocol(ProtocolError::ConnectFailed { .. })
        ));
        assert!(!state.snapshot().is_connected());
    }
}
