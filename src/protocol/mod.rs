// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telnet protocol implementation for NAD receivers.
//!
//! # Layers
//!
//! - [`encode`] / [`decode`]: text lines to and from typed values
//! - [`TelnetLineCodec`]: byte stream framing with Telnet negotiation removed
//! - [`Session`]: one socket, one request in flight, canonical state updates
//!
//! The [`PowerLink`] trait is the seam between the power controller and
//! whatever carries its requests, a bare [`Session`] or a
//! [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor).

mod codec;
mod line_codec;
mod session;
mod worker;

pub use codec::{LINE_DELIMITER, decode, encode};
pub use line_codec::{MAX_LINE_LENGTH, TelnetLineCodec};
pub use session::{Session, SessionConfig, SessionEvent};

use crate::error::Result;
use crate::types::PowerState;

/// Power operations on a receiver's main zone.
#[allow(async_fn_in_trait)]
pub trait PowerLink {
    /// Returns the cached power state without blocking.
    fn power(&self) -> PowerState;

    /// Queries the receiver and returns the reported power state.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or times out.
    async fn refresh_power(&self) -> Result<PowerState>;

    /// Sets the power state and returns the state the receiver echoed.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or times out.
    async fn set_power(&self, power: PowerState) -> Result<PowerState>;
}
