// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DeviceConfig;
use crate::controller::PowerController;
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::subscription::Subscribable;
use crate::supervisor::{ConnectionState, ConnectionSupervisor, SupervisorConfig};
use crate::types::Endpoint;

/// A receiver owned by the manager: its supervisor, its controller and the
/// tasks that relay their state to the event bus.
pub(crate) struct ManagedReceiver {
    pub config: DeviceConfig,
    pub supervisor: ConnectionSupervisor,
    pub controller: Arc<PowerController<ConnectionSupervisor>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ManagedReceiver {
    /// Starts supervision of `endpoint` and wires events to `bus`.
    pub fn start(
        config: DeviceConfig,
        endpoint: Endpoint,
        supervisor_config: SupervisorConfig,
        bus: &EventBus,
    ) -> Self {
        let device_id = config.device_id.clone();
        let supervisor = ConnectionSupervisor::new(endpoint, supervisor_config);
        let controller = Arc::new(PowerController::new(supervisor.clone()));

        {
            let bus = bus.clone();
            let device_id = device_id.clone();
            controller.on_power_changed(move |power| {
                bus.publish(DeviceEvent::PowerChanged {
                    device_id: device_id.clone(),
                    power,
                });
            });
        }

        let forwarder = controller.spawn_state_forwarder(supervisor.state().watch());
        let relay = tokio::spawn(relay_connection(
            device_id,
            supervisor.watch_connection(),
            bus.clone(),
        ));
        supervisor.start();

        Self {
            config,
            supervisor,
            controller,
            tasks: vec![forwarder, relay],
        }
    }

    /// Stops supervision and the relay tasks.
    pub fn stop(&self) {
        self.supervisor.shutdown();
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn relay_connection(
    device_id: DeviceId,
    mut rx: watch::Receiver<ConnectionState>,
    bus: EventBus,
) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        bus.publish(DeviceEvent::ConnectionChanged {
            device_id: device_id.clone(),
            state,
        });
    }
}
