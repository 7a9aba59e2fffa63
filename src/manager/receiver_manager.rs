// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager coordinating several NAD receivers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use crate::config::{ConfigStore, DeviceConfig};
use crate::controller::PowerController;
use crate::discovery::DiscoveredReceiver;
use crate::error::{ConfigError, Error, Result};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::platform::{Entity, EntityState, PowerIntent};
use crate::protocol::Session;
use crate::state::{DeviceState, StateCell};
use crate::supervisor::{ConnectionState, ConnectionSupervisor, SupervisorConfig};
use crate::types::Endpoint;

use super::managed_receiver::ManagedReceiver;

/// Manager for a set of receivers.
///
/// Each receiver gets its own [`ConnectionSupervisor`] and
/// [`PowerController`]; receivers share nothing else. When a [`ConfigStore`]
/// is attached, added and removed receivers are persisted.
///
/// # Examples
///
/// ```no_run
/// use nad_telnet::config::ConfigStore;
/// use nad_telnet::manager::ReceiverManager;
/// use nad_telnet::platform::PowerIntent;
///
/// #[tokio::main]
/// async fn main() -> nad_telnet::Result<()> {
///     let manager = ReceiverManager::new().with_store(ConfigStore::from_env()?);
///     manager.load_configured().await?;
///
///     let device_id = manager.configure_device("Living Room", "192.168.1.10", 23).await?;
///     manager.command(&device_id, PowerIntent::TurnOn).await?;
///
///     manager.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ReceiverManager {
    devices: Arc<RwLock<HashMap<DeviceId, ManagedReceiver>>>,
    store: Option<Arc<parking_lot::Mutex<ConfigStore>>>,
    event_bus: EventBus,
    supervisor_config: SupervisorConfig,
}

impl ReceiverManager {
    /// Creates a manager without persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            store: None,
            event_bus: EventBus::new(),
            supervisor_config: SupervisorConfig::default(),
        }
    }

    /// Persists configured receivers in `store`.
    #[must_use]
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(Arc::new(parking_lot::Mutex::new(store)));
        self
    }

    /// Sets the supervisor configuration used for receivers added from now on.
    #[must_use]
    pub fn with_supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.supervisor_config = config;
        self
    }

    /// Subscribes to events of all managed receivers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_bus.subscribe()
    }

    // =========================================================================
    // Device Management
    // =========================================================================

    /// Starts managing a receiver and persists its configuration.
    ///
    /// A receiver with the same ID is replaced.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the address is invalid or the configuration
    /// cannot be saved.
    pub async fn add_device(&self, config: DeviceConfig) -> Result<DeviceId> {
        config.endpoint()?;
        if let Some(store) = &self.store {
            store.lock().add(config.clone())?;
        }
        self.insert(config).await
    }

    async fn insert(&self, config: DeviceConfig) -> Result<DeviceId> {
        let endpoint = config.endpoint()?;
        let device_id = config.device_id.clone();

        tracing::info!(device_id = %device_id, endpoint = %endpoint, "Adding receiver");
        let receiver = ManagedReceiver::start(
            config,
            endpoint,
            self.supervisor_config.clone(),
            &self.event_bus,
        );

        let previous = self
            .devices
            .write()
            .await
            .insert(device_id.clone(), receiver);
        if let Some(previous) = previous {
            previous.stop();
        }

        self.event_bus.publish(DeviceEvent::DeviceAdded {
            device_id: device_id.clone(),
        });
        Ok(device_id)
    }

    /// Stops managing a receiver and forgets its configuration.
    ///
    /// The receiver is stopped even if the configuration cannot be saved.
    /// Returns `false` if the receiver was neither managed nor stored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration cannot be saved.
    pub async fn remove_device(&self, device_id: &DeviceId) -> Result<bool> {
        let removed = self.devices.write().await.remove(device_id);
        let managed = removed.is_some();
        if let Some(receiver) = removed {
            receiver.stop();
            tracing::info!(device_id = %device_id, "Removed receiver");
            self.event_bus.publish(DeviceEvent::DeviceRemoved {
                device_id: device_id.clone(),
            });
        }

        let stored = match &self.store {
            Some(store) => store.lock().remove(device_id)?,
            None => false,
        };
        Ok(managed || stored)
    }

    /// Sets up a receiver from user input.
    ///
    /// The endpoint is validated and probed with a power query before the
    /// receiver is added. A receiver already managed at the same endpoint is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` for an invalid address or port,
    /// `ConfigError::Unreachable` if the probe fails, or any error of
    /// [`ReceiverManager::add_device`].
    pub async fn configure_device(&self, name: &str, address: &str, port: u16) -> Result<DeviceId> {
        let endpoint = Endpoint::new(address, port)?;
        let device_id = DeviceId::for_endpoint(&endpoint);

        if let Some(existing) = self.devices.read().await.get(&device_id)
            && existing.supervisor.endpoint() == &endpoint
        {
            tracing::info!(device_id = %device_id, "Receiver already configured");
            return Ok(device_id);
        }

        probe(&endpoint, &self.supervisor_config).await?;

        let name = if name.trim().is_empty() {
            format!("NAD {}", endpoint.host())
        } else {
            name.trim().to_string()
        };
        self.add_device(DeviceConfig::new(name, &endpoint)).await
    }

    /// Sets up a receiver found by [`discover`](crate::discovery::discover).
    ///
    /// # Errors
    ///
    /// Same as [`ReceiverManager::configure_device`].
    pub async fn configure_discovered(&self, receiver: &DiscoveredReceiver) -> Result<DeviceId> {
        self.configure_device(&receiver.name, &receiver.address, receiver.port)
            .await
    }

    /// Starts every enabled receiver in the attached store.
    ///
    /// Returns the number of receivers started.
    ///
    /// # Errors
    ///
    /// Returns the first error from an invalid stored configuration.
    pub async fn load_configured(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let configs: Vec<DeviceConfig> = store.lock().enabled().cloned().collect();

        let count = configs.len();
        for config in configs {
            self.insert(config).await?;
        }
        tracing::info!(count, "Loaded configured receivers");
        Ok(count)
    }

    /// Returns the IDs of all managed receivers.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of managed receivers.
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns the configuration of a managed receiver.
    pub async fn device_config(&self, device_id: &DeviceId) -> Option<DeviceConfig> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.config.clone())
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns a snapshot of a receiver's state.
    pub async fn get_state(&self, device_id: &DeviceId) -> Option<DeviceState> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.supervisor.state().snapshot())
    }

    /// Returns the entity state the platform should show.
    pub async fn entity_state(&self, device_id: &DeviceId) -> Option<EntityState> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.controller.entity_state())
    }

    /// Returns the connection state of a receiver.
    pub async fn connection_state(&self, device_id: &DeviceId) -> Option<ConnectionState> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.supervisor.connection_state())
    }

    /// Returns the controller of a receiver, to subscribe to its callbacks.
    pub async fn controller(
        &self,
        device_id: &DeviceId,
    ) -> Option<Arc<PowerController<ConnectionSupervisor>>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| Arc::clone(&d.controller))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Executes a platform intent on a receiver.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown receiver, otherwise the
    /// controller's error.
    pub async fn command(&self, device_id: &DeviceId, intent: PowerIntent) -> Result<()> {
        let controller = self
            .controller(device_id)
            .await
            .ok_or(Error::DeviceNotFound)?;
        tracing::debug!(device_id = %device_id, intent = %intent, "Executing command");
        controller.on_command(intent).await
    }

    /// Forces every receiver to reconnect, e.g. after the host left standby.
    pub async fn reconnect_all(&self) {
        for receiver in self.devices.read().await.values() {
            receiver.supervisor.reconnect();
        }
    }

    /// Stops all receivers. Configuration on disk is kept.
    pub async fn shutdown(&self) {
        let receivers: Vec<ManagedReceiver> =
            self.devices.write().await.drain().map(|(_, r)| r).collect();
        for receiver in &receivers {
            receiver.stop();
        }
        tracing::info!(count = receivers.len(), "Receiver manager shut down");
    }
}

async fn probe(endpoint: &Endpoint, config: &SupervisorConfig) -> Result<()> {
    tracing::debug!(endpoint = %endpoint, "Probing receiver");
    let unreachable = |e: &Error| ConfigError::Unreachable {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    };

    let (session, _events) = Session::connect(endpoint.clone(), config.session(), StateCell::new())
        .await
        .map_err(|e| unreachable(&e))?;
    let result = session.refresh_power().await;
    session.shutdown();

    match result {
        Ok(power) => {
            tracing::info!(endpoint = %endpoint, power = %power, "Receiver answered probe");
            Ok(())
        }
        Err(e) => Err(unreachable(&e).into()),
    }
}

impl Default for ReceiverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverManager")
            .field("persistent", &self.store.is_some())
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}
