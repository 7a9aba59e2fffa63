// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver manager tests: setup, persistence, commands and events.

mod common;

use std::time::Duration;

use common::FakeReceiver;
use nad_telnet::{
    ConfigError, ConfigStore, ConnectionState, DeviceConfig, DeviceEvent, DeviceId,
    DiscoveredReceiver, EntityState, Error, PowerIntent, PowerState, ReceiverManager, ReconnectionPolicy, SessionConfig,
    SupervisorConfig,
};

fn supervisor_config() -> SupervisorConfig {
    SupervisorConfig::new()
        .with_session(
            SessionConfig::new()
                .with_response_timeout(Duration::from_millis(300))
                .with_connect_timeout(Duration::from_secs(1)),
        )
        .with_reconnection(ReconnectionPolicy::new().with_first_delay(Duration::from_millis(50)))
}

fn manager(dir: &tempfile::TempDir) -> ReceiverManager {
    ReceiverManager::new()
        .with_supervisor_config(supervisor_config())
        .with_store(ConfigStore::open(dir.path()).unwrap())
}

async fn wait_until(manager: &ReceiverManager, device_id: &DeviceId, entity: EntityState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while manager.entity_state(device_id).await != Some(entity) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "receiver did not reach {entity}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn configure_persists_and_controls_receiver() {
    let receiver = FakeReceiver::builder().power("Off").start().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let device_id = manager
        .configure_device("Living Room", "127.0.0.1", receiver.endpoint.port())
        .await
        .unwrap();
    assert_eq!(device_id.as_str(), "nad_127_0_0_1");

    let stored = ConfigStore::open(dir.path()).unwrap();
    assert_eq!(stored.all().len(), 1);
    assert_eq!(stored.all()[0].name, "Living Room");
    assert_eq!(stored.all()[0].port, receiver.endpoint.port());

    wait_until(&manager, &device_id, EntityState::Off).await;
    assert_eq!(
        manager.connection_state(&device_id).await,
        Some(ConnectionState::Connected)
    );

    manager.command(&device_id, PowerIntent::TurnOn).await.unwrap();
    assert_eq!(receiver.power(), "On");
    assert_eq!(manager.entity_state(&device_id).await, Some(EntityState::On));

    manager.command(&device_id, PowerIntent::Toggle).await.unwrap();
    assert_eq!(receiver.power(), "Off");
    assert_eq!(
        manager.get_state(&device_id).await.map(|s| s.power()),
        Some(PowerState::Off)
    );

    manager.shutdown().await;
    assert_eq!(manager.device_count().await, 0);
    assert_eq!(ConfigStore::open(dir.path()).unwrap().all().len(), 1);
}

#[tokio::test]
async fn configure_is_idempotent() {
    let receiver = FakeReceiver::start().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    let port = receiver.endpoint.port();

    let first = manager.configure_device("Den", "127.0.0.1", port).await.unwrap();
    let second = manager.configure_device("Den", "127.0.0.1", port).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(manager.device_count().await, 1);
    assert_eq!(ConfigStore::open(dir.path()).unwrap().all().len(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn configure_discovered_uses_announced_name() {
    let receiver = FakeReceiver::start().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let discovered = DiscoveredReceiver {
        name: "C 658 - Living Room Remote".to_string(),
        address: "127.0.0.1".to_string(),
        port: receiver.endpoint.port(),
    };
    let device_id = manager.configure_discovered(&discovered).await.unwrap();

    assert_eq!(device_id, DeviceId::for_endpoint(&discovered.endpoint().unwrap()));
    let config = manager.device_config(&device_id).await.unwrap();
    assert_eq!(config.name, "C 658 - Living Room Remote");
    wait_until(&manager, &device_id, EntityState::On).await;

    manager.shutdown().await;
}

#[tokio::test]
async fn configure_unreachable_receiver_is_terminal() {
    let receiver = FakeReceiver::start().await;
    let port = receiver.endpoint.port();
    drop(receiver);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let err = manager
        .configure_device("Den", "127.0.0.1", port)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Unreachable { .. })));
    assert_eq!(manager.device_count().await, 0);
    assert!(ConfigStore::open(dir.path()).unwrap().all().is_empty());
}

#[tokio::test]
async fn load_configured_starts_enabled_receivers() {
    let receiver = FakeReceiver::start().await;
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = ConfigStore::open(dir.path()).unwrap();
        store
            .add(DeviceConfig::new("Living Room", &receiver.endpoint))
            .unwrap();
        let disabled = nad_telnet::Endpoint::new("192.0.2.1", 23).unwrap();
        store
            .add(DeviceConfig::new("Garage", &disabled).with_enabled(false))
            .unwrap();
    }

    let manager = manager(&dir);
    assert_eq!(manager.load_configured().await.unwrap(), 1);

    let ids = manager.device_ids().await;
    assert_eq!(ids, [DeviceId::for_endpoint(&receiver.endpoint)]);
    wait_until(&manager, &ids[0], EntityState::On).await;

    manager.shutdown().await;
}

#[tokio::test]
async fn events_follow_receiver() {
    let receiver = FakeReceiver::builder().power("Off").start().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);
    let mut events = manager.subscribe();

    let device_id = manager
        .add_device(DeviceConfig::new("Den", &receiver.endpoint))
        .await
        .unwrap();
    wait_until(&manager, &device_id, EntityState::Off).await;

    receiver.push("Main.Power=On");

    let mut added = false;
    let mut connected = false;
    let deadline = Duration::from_secs(5);
    let power_on = tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await.unwrap() {
                DeviceEvent::DeviceAdded { device_id: id } => {
                    assert_eq!(id, device_id);
                    added = true;
                }
                DeviceEvent::ConnectionChanged { state, .. } if state.is_connected() => {
                    connected = true;
                }
                DeviceEvent::PowerChanged {
                    power: PowerState::On,
                    ..
                } => break,
                _ => {}
            }
        }
    })
    .await;

    assert!(power_on.is_ok(), "no power event");
    assert!(added);
    assert!(connected);

    assert!(manager.remove_device(&device_id).await.unwrap());
    assert!(manager.entity_state(&device_id).await.is_none());
    assert!(ConfigStore::open(dir.path()).unwrap().all().is_empty());
}

#[tokio::test]
async fn reconnect_all_reopens_sessions() {
    let receiver = FakeReceiver::start().await;
    let manager = ReceiverManager::new().with_supervisor_config(supervisor_config());
    let device_id = manager
        .add_device(DeviceConfig::new("Den", &receiver.endpoint))
        .await
        .unwrap();
    wait_until(&manager, &device_id, EntityState::On).await;

    manager.reconnect_all().await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while receiver.connections() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "no new session");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    manager.shutdown().await;
}
