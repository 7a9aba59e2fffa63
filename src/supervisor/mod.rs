// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection supervision for one receiver.
//!
//! A [`ConnectionSupervisor`] owns the endpoint of a receiver and keeps a
//! [`Session`] open to it:
//!
//! - the first connection attempt starts immediately
//! - after a lost connection or a failed attempt it retries with the
//!   backoff of its [`ReconnectionPolicy`], reset on every successful connect
//! - a connected session is polled with `Main.Power?` on a fixed interval,
//!   and right away after a request timed out; a failed poll counts as a
//!   lost connection
//!
//! The receiver's [`DeviceState`](crate::state::DeviceState) survives
//! reconnects: the supervisor hands the same [`StateCell`] to every session.

mod config;
mod connection_state;

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use config::{ReconnectionPolicy, SupervisorConfig};
pub use connection_state::ConnectionState;

use crate::command::Command;
use crate::error::{ProtocolError, Result};
use crate::protocol::{PowerLink, Session, SessionEvent};
use crate::response::Response;
use crate::state::StateCell;
use crate::types::{Endpoint, PowerState};

/// Why a supervised session ended.
enum Outcome {
    Shutdown,
    Reconnect,
    Lost(String),
}

struct Inner {
    endpoint: Endpoint,
    config: SupervisorConfig,
    state: StateCell,
    session: RwLock<Option<Session>>,
    connection: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    // notify_waiters only: a request wakes futures created before it and is
    // never stored for later
    reconnect: Notify,
    started: AtomicBool,
}

/// Keeps a session to one receiver alive.
///
/// Cloning yields another handle to the same supervisor.
///
/// # Examples
///
/// ```no_run
/// use nad_telnet::supervisor::{ConnectionSupervisor, SupervisorConfig};
///
/// # async fn example() -> nad_telnet::Result<()> {
/// let supervisor = ConnectionSupervisor::new("192.168.1.20".parse()?, SupervisorConfig::default());
/// supervisor.start();
///
/// let mut connection = supervisor.watch_connection();
/// while !connection.borrow_and_update().is_connected() {
///     connection.changed().await.ok();
/// }
///
/// println!("Power: {}", supervisor.refresh_power().await?);
/// supervisor.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor. Nothing connects until [`start`](Self::start).
    #[must_use]
    pub fn new(endpoint: Endpoint, config: SupervisorConfig) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                endpoint,
                config,
                state: StateCell::new(),
                session: RwLock::new(None),
                connection,
                cancel: CancellationToken::new(),
                reconnect: Notify::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Spawns the supervision task. Calling it again has no effect.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(self.clone().run());
    }

    /// Returns the supervised endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns the receiver's state cell.
    #[must_use]
    pub fn state(&self) -> &StateCell {
        &self.inner.state
    }

    /// Returns the current session, if connected.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.inner.session.read().clone()
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.borrow().clone()
    }

    /// Returns a receiver notified on every connection state change.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }

    /// Drops the current session and reconnects right away with the backoff
    /// reset. Also revives a supervisor that gave up.
    ///
    /// Ignored while a connection attempt is in flight, since that attempt
    /// opens a fresh session anyway.
    pub fn reconnect(&self) {
        tracing::info!(endpoint = %self.inner.endpoint, "Reconnect requested");
        self.inner.reconnect.notify_waiters();
    }


    /// Stops supervision. Pending requests fail with `ConnectionLost`.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(session) = self.inner.session.write().take() {
            session.shutdown();
        }
        self.set_connection(ConnectionState::Disconnected);
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ========== Requests ==========

    /// Sends a command on the current session.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::NotConnected` if there is no session, otherwise
    /// see [`Session::send`].
    pub async fn send(&self, command: Command) -> Result<Response> {
        self.current()?.send(command).await
    }

    /// Queries the receiver's power state.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::NotConnected` if there is no session, otherwise
    /// see [`Session::refresh_power`].
    pub async fn refresh_power(&self) -> Result<PowerState> {
        self.current()?.refresh_power().await
    }

    /// Sets the receiver's power state.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::NotConnected` if there is no session, otherwise
    /// see [`Session::set_power`].
    pub async fn set_power(&self, power: PowerState) -> Result<PowerState> {
        self.current()?.set_power(power).await
    }

    fn current(&self) -> Result<Session> {
        self.session()
            .filter(|session| !session.is_closed())
            .ok_or_else(|| ProtocolError::NotConnected.into())
    }

    fn set_connection(&self, state: ConnectionState) {
        self.inner.connection.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    // ========== Supervision ==========

    async fn run(self) {
        let endpoint = self.inner.endpoint.clone();
        let policy = self.inner.config.reconnection().clone();
        let mut retry: u32 = 0;
        let mut immediate = true;
        let mut last_error = String::new();

        loop {
            if self.inner.cancel.is_cancelled() {
                break;
            }

            if immediate {
                self.set_connection(ConnectionState::Connecting);
            } else {
                if !policy.should_retry(retry) {
                    tracing::error!(endpoint = %endpoint, error = %last_error, "Giving up on receiver");
                    let requested = self.inner.reconnect.notified();
                    self.set_connection(ConnectionState::Failed(last_error.clone()));
                    tokio::select! {
                        () = self.inner.cancel.cancelled() => break,
                        () = requested => {
                            retry = 0;
                            immediate = true;
                            continue;
                        }
                    }
                }

                let delay = policy.delay_for_attempt(retry);
                retry = retry.saturating_add(1);
                let requested = self.inner.reconnect.notified();
                self.set_connection(ConnectionState::Reconnecting { attempt: retry });
                tracing::info!(endpoint = %endpoint, attempt = retry, ?delay, "Reconnecting");

                tokio::select! {
                    () = self.inner.cancel.cancelled() => break,
                    () = requested => retry = 0,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            immediate = false;

            let connect = Session::connect(
                endpoint.clone(),
                self.inner.config.session(),
                self.inner.state.clone(),
            );
            let result = tokio::select! {
                () = self.inner.cancel.cancelled() => break,
                result = connect => result,
            };

            let (session, events) = match result {
                Ok(connected) => connected,
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Connection attempt failed");
                    last_error = e.to_string();
                    continue;
                }
            };

            retry = 0;
            let requested = self.inner.reconnect.notified();
            tokio::pin!(requested);
            *self.inner.session.write() = Some(session.clone());
            if self.inner.cancel.is_cancelled() {
                // shutdown() ran between connect and publishing the session
                session.shutdown();
                break;
            }
            self.set_connection(ConnectionState::Connected);

            let outcome = self.supervise(&session, events, requested).await;
            self.inner.session.write().take();
            session.shutdown();

            match outcome {
                Outcome::Shutdown => break,
                Outcome::Reconnect => immediate = true,
                Outcome::Lost(reason) => {
                    tracing::warn!(endpoint = %endpoint, reason = %reason, "Session lost");
                    last_error = reason;
                }
            }
        }

        self.inner.session.write().take();
        self.set_connection(ConnectionState::Disconnected);
        tracing::debug!(endpoint = %endpoint, "Supervisor stopped");
    }

    async fn supervise(
        &self,
        session: &Session,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        mut reconnect: Pin<&mut Notified<'_>>,
    ) -> Outcome {
        let interval = self.inner.config.health_check_interval();
        let mut health = tokio::time::interval_at(Instant::now() + interval, interval);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => return Outcome::Shutdown,
                () = reconnect.as_mut() => return Outcome::Reconnect,
                event = events.recv() => match event {
                    Some(SessionEvent::ConnectionLost(reason)) => return Outcome::Lost(reason),
                    Some(SessionEvent::ResponseTimeout(command)) => {
                        tracing::debug!(
                            endpoint = %self.inner.endpoint,
                            parameter = command.parameter(),
                            "Request timed out, checking receiver"
                        );
                        if let Err(reason) = health_check(session).await {
                            return Outcome::Lost(reason);
                        }
                        health.reset();
                    }
                    None => return Outcome::Lost("session ended".to_string()),
                },
                _ = health.tick() => {
                    if let Err(reason) = health_check(session).await {
                        return Outcome::Lost(reason);
                    }
                }
            }
        }
    }
}

async fn health_check(session: &Session) -> std::result::Result<(), String> {
    match session.refresh_power().await {
        Ok(power) => {
            tracing::debug!(endpoint = %session.endpoint(), power = %power, "Health check passed");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(endpoint = %session.endpoint(), error = %e, "Health check failed");
            Err(format!("health check failed: {e}"))
        }
    }
}

impl PowerLink for ConnectionSupervisor {
    fn power(&self) -> PowerState {
        self.inner.state.snapshot().power()
    }

    async fn refresh_power(&self) -> Result<PowerState> {
        ConnectionSupervisor::refresh_power(self).await
    }

    async fn set_power(&self, power: PowerState) -> Result<PowerState> {
        ConnectionSupervisor::set_power(self, power).await
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("endpoint", &self.inner.endpoint)
            .field("connection", &self.connection_state())
            .finish_non_exhaustive()
    }
}
