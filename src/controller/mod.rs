// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state machine exposed to the platform.
//!
//! [`PowerController`] turns platform intents into power commands on a
//! [`PowerLink`] and keeps an entity view of the receiver that it pushes to
//! subscribers.
//!
//! | Intent | Cached state | Command sent |
//! |--------|--------------|--------------|
//! | `TurnOn` | any | `Main.Power=On` |
//! | `TurnOff` | any | `Main.Power=Off` |
//! | `Toggle` | `On` | `Main.Power=Off` |
//! | `Toggle` | `Off` | `Main.Power=On` |
//! | `Toggle` | `Unknown` | `Main.Power?` first, then as above (`On` if still unknown) |

use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::platform::{Entity, EntityState, PowerIntent};
use crate::protocol::PowerLink;
use crate::state::{DeviceState, StateChange};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::PowerState;

#[derive(Debug, Clone, Copy, Default)]
struct Mirror {
    power: PowerState,
    connected: bool,
    entity: EntityState,
}

/// Controls the power of one receiver on behalf of the platform.
///
/// The controller is generic over its [`PowerLink`]: a
/// [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor) in
/// production, any fake in tests.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use nad_telnet::controller::PowerController;
/// use nad_telnet::platform::PowerIntent;
/// use nad_telnet::supervisor::{ConnectionSupervisor, SupervisorConfig};
///
/// # async fn example() -> nad_telnet::Result<()> {
/// let supervisor = ConnectionSupervisor::new("192.168.1.20".parse()?, SupervisorConfig::default());
/// supervisor.start();
///
/// let controller = Arc::new(PowerController::new(supervisor.clone()));
/// controller.spawn_state_forwarder(supervisor.state().watch());
///
/// controller.command(PowerIntent::Toggle).await?;
/// # Ok(())
/// # }
/// ```
pub struct PowerController<L: PowerLink> {
    link: L,
    mirror: RwLock<Mirror>,
    callbacks: CallbackRegistry,
}

impl<L: PowerLink> PowerController<L> {
    /// Creates a controller on top of a link.
    pub fn new(link: L) -> Self {
        let power = link.power();
        Self {
            link,
            mirror: RwLock::new(Mirror {
                power,
                connected: false,
                entity: EntityState::Unavailable,
            }),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Returns the underlying link.
    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Returns the controller's power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.mirror.read().power
    }

    // ========== Intents ==========

    /// Executes a platform intent.
    ///
    /// # Errors
    ///
    /// Returns the link error if the command fails. The controller state is
    /// unchanged in that case.
    pub async fn command(&self, intent: PowerIntent) -> Result<()> {
        match intent {
            PowerIntent::TurnOn => self.turn_on().await,
            PowerIntent::TurnOff => self.turn_off().await,
            PowerIntent::Toggle => self.toggle().await,
        }
    }

    /// Turns the receiver on.
    ///
    /// # Errors
    ///
    /// Returns the link error if the command fails.
    pub async fn turn_on(&self) -> Result<()> {
        self.apply_power(PowerState::On).await
    }

    /// Puts the receiver in standby.
    ///
    /// # Errors
    ///
    /// Returns the link error if the command fails.
    pub async fn turn_off(&self) -> Result<()> {
        self.apply_power(PowerState::Off).await
    }

    /// Flips the power state, querying it first if it is unknown.
    ///
    /// # Errors
    ///
    /// Returns the link error if the power command fails. A failed query only
    /// means the receiver is turned on.
    pub async fn toggle(&self) -> Result<()> {
        let mut current = self.power();
        if !current.is_known() {
            current = self.link.power();
        }
        if !current.is_known() {
            current = match self.link.refresh_power().await {
                Ok(power) => power,
                Err(e) => {
                    tracing::warn!(error = %e, "Power state unknown before toggle");
                    PowerState::Unknown
                }
            };
        }

        let target = if current.is_known() {
            current.toggled()
        } else {
            PowerState::On
        };
        self.apply_power(target).await
    }

    async fn apply_power(&self, target: PowerState) -> Result<()> {
        if let Err(e) = self.link.set_power(target).await {
            tracing::warn!(power = %target, error = %e, "Power command failed");
            return Err(e);
        }
        self.record_power(target);
        Ok(())
    }

    fn record_power(&self, power: PowerState) {
        let entity = {
            let mut mirror = self.mirror.write();
            if mirror.power == power {
                return;
            }
            mirror.power = power;
            let entity = if mirror.connected {
                power.into()
            } else {
                EntityState::Unavailable
            };
            let entity_changed = mirror.entity != entity;
            mirror.entity = entity;
            entity_changed.then_some(entity)
        };

        self.callbacks.dispatch(&StateChange::power(power));
        if let Some(entity) = entity {
            self.callbacks.dispatch_entity_state(entity);
        }
    }

    // ========== State forwarding ==========

    /// Spawns a task that feeds receiver state changes into this controller.
    ///
    /// The task ends when the sender side of `rx` is dropped or the
    /// controller is.
    pub fn spawn_state_forwarder(self: &Arc<Self>, rx: watch::Receiver<DeviceState>) -> JoinHandle<()>
    where
        L: Send + Sync + 'static,
    {
        let controller = Arc::downgrade(self);
        tokio::spawn(forward_state(controller, rx))
    }
}

async fn forward_state<L: PowerLink>(
    controller: Weak<PowerController<L>>,
    mut rx: watch::Receiver<DeviceState>,
) {
    loop {
        let snapshot = rx.borrow_and_update().clone();
        let Some(strong) = controller.upgrade() else {
            break;
        };
        strong.on_state_change(&snapshot);
        drop(strong);

        if rx.changed().await.is_err() {
            break;
        }
    }
}

impl<L: PowerLink> Entity for PowerController<L> {
    async fn on_command(&self, intent: PowerIntent) -> Result<()> {
        self.command(intent).await
    }

    fn on_state_change(&self, state: &DeviceState) {
        let entity = EntityState::from(state);
        let (previous, power_changed) = {
            let mut mirror = self.mirror.write();
            let previous = *mirror;
            mirror.power = state.power();
            mirror.connected = state.is_connected();
            mirror.entity = entity;
            (previous, previous.power != state.power())
        };

        if state.is_connected() && !previous.connected {
            self.callbacks.dispatch(&StateChange::Connected);
            self.callbacks.dispatch_connected(state);
        }
        if power_changed {
            self.callbacks.dispatch(&StateChange::Power {
                state: state.power(),
                at: state.last_updated().unwrap_or_else(Utc::now),
            });
        }
        if !state.is_connected() && previous.connected {
            self.callbacks.dispatch(&StateChange::Disconnected);
            self.callbacks.dispatch_disconnected();
        }
        if previous.entity != entity {
            tracing::debug!(state = %entity, "Entity state changed");
            self.callbacks.dispatch_entity_state(entity);
        }
    }

    fn entity_state(&self) -> EntityState {
        self.mirror.read().entity
    }
}

impl<L: PowerLink> Subscribable for PowerController<L> {
    fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        self.callbacks.on_power_changed(callback)
    }

    fn on_entity_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(EntityState) + Send + Sync + 'static,
    {
        self.callbacks.on_entity_state_changed(callback)
    }

    fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.callbacks.on_connected(callback)
    }

    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_disconnected(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.callbacks.on_state_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

impl<L: PowerLink> std::fmt::Debug for PowerController<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mirror = *self.mirror.read();
        f.debug_struct("PowerController")
            .field("power", &mirror.power)
            .field("entity", &mirror.entity)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
