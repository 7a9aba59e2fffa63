// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared, observable device state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::{DeviceState, StateChange};

/// Holds the [`DeviceState`] of one receiver.
///
/// Only the session writes to the cell. Everyone else takes snapshots or
/// watches for changes. Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<DeviceState>>,
}

impl StateCell {
    /// Creates a cell holding a disconnected, unknown state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DeviceState::new());
        Self { tx: Arc::new(tx) }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        self.tx.borrow().clone()
    }

    /// Returns a receiver notified on every observable change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DeviceState> {
        self.tx.subscribe()
    }

    /// Applies a change, notifying watchers only if it was observable.
    pub(crate) fn apply(&self, change: &StateChange) -> bool {
        self.tx.send_if_modified(|state| state.apply(change))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
