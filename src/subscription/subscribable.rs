// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that push receiver state changes.

use crate::platform::EntityState;
use crate::state::{DeviceState, StateChange};
use crate::subscription::SubscriptionId;
use crate::types::PowerState;

/// Trait for types that support event subscriptions.
///
/// # Examples
///
/// ```no_run
/// use nad_telnet::controller::PowerController;
/// use nad_telnet::subscription::Subscribable;
/// use nad_telnet::supervisor::{ConnectionSupervisor, SupervisorConfig};
///
/// # fn example() -> nad_telnet::Result<()> {
/// let supervisor = ConnectionSupervisor::new("192.168.1.20".parse()?, SupervisorConfig::default());
/// let controller = PowerController::new(supervisor);
///
/// let sub_id = controller.on_entity_state_changed(|state| {
///     println!("Receiver is now {state}");
/// });
///
/// controller.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to power state changes.
    fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static;

    /// Subscribes to entity state changes, including `Unavailable`.
    fn on_entity_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(EntityState) + Send + Sync + 'static;

    /// Subscribes to connection events.
    ///
    /// The callback receives the receiver state when the session opened.
    fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static;

    /// Subscribes to disconnection events.
    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static;

    /// Subscribes to all state changes.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
