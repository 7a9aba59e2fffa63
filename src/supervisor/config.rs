// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supervisor configuration.

use std::time::Duration;

use crate::protocol::SessionConfig;

/// Configuration for a [`ConnectionSupervisor`](super::ConnectionSupervisor).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nad_telnet::protocol::SessionConfig;
/// use nad_telnet::supervisor::{ReconnectionPolicy, SupervisorConfig};
///
/// let config = SupervisorConfig::new()
///     .with_session(SessionConfig::new().with_response_timeout(Duration::from_secs(2)))
///     .with_reconnection(ReconnectionPolicy::new().with_retry_limit(5))
///     .with_health_check_interval(Duration::from_secs(30));
///
/// assert_eq!(config.health_check_interval(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    session: SessionConfig,
    reconnection: ReconnectionPolicy,
    health_check_interval: Duration,
}

impl SupervisorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration used for every session.
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets how often a connected session is polled for its power state.
    #[must_use]
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub fn reconnection(&self) -> &ReconnectionPolicy {
        &self.reconnection
    }

    /// Returns the health check interval.
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reconnection: ReconnectionPolicy::default(),
            health_check_interval: Duration::from_secs(60),
        }
    }
}

/// When and how fast the supervisor retries a lost receiver.
///
/// Retry `n` (zero-based) waits `first_delay * factor^n`, never longer than
/// `delay_cap`. A successful connect starts the sequence over.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nad_telnet::supervisor::ReconnectionPolicy;
///
/// // 1 s, 2 s, 4 s ... at most 30 s, forever
/// let policy = ReconnectionPolicy::default();
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
///
/// // Stay down after the first loss
/// let policy = ReconnectionPolicy::disabled();
/// assert!(!policy.should_retry(0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectionPolicy {
    enabled: bool,
    retry_limit: Option<u32>,
    first_delay: Duration,
    delay_cap: Duration,
    factor: f64,
}

impl ReconnectionPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never reconnects.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Gives up after `limit` failed retries.
    #[must_use]
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Retries until shut down.
    #[must_use]
    pub fn with_unlimited_retries(mut self) -> Self {
        self.retry_limit = None;
        self
    }

    /// Sets the wait before the first retry.
    #[must_use]
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self
    }

    /// Sets the longest wait between retries.
    #[must_use]
    pub fn with_delay_cap(mut self, cap: Duration) -> Self {
        self.delay_cap = cap;
        self
    }

    /// Sets the growth factor between consecutive waits.
    #[must_use]
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Returns `false` for a policy built with [`ReconnectionPolicy::disabled`].
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the retry limit, `None` when unlimited.
    #[must_use]
    pub fn retry_limit(&self) -> Option<u32> {
        self.retry_limit
    }

    /// Returns the wait before retry `attempt` (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.first_delay.as_secs_f64() * self.factor.powi(exponent);

        // non-finite or negative products fall back to the cap
        Duration::try_from_secs_f64(secs).map_or(self.delay_cap, |delay| delay.min(self.delay_cap))
    }

    /// Returns `true` if retry `attempt` (zero-based) may run.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        match (self.enabled, self.retry_limit) {
            (false, _) => false,
            (true, None) => true,
            (true, Some(limit)) => attempt < limit,
        }
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_limit: None,
            first_delay: Duration::from_secs(1),
            delay_cap: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}
