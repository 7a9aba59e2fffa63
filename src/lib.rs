// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NAD Telnet - A Rust library to control the power state of NAD receivers.
//!
//! NAD receivers expose a line-based control protocol over Telnet (TCP port
//! 23). Commands look like `Main.Power?` or `Main.Power=On` and the receiver
//! answers, and pushes changes, as `Main.Power=On`.
//!
//! # Layers
//!
//! - **Codec** ([`protocol::encode`], [`protocol::decode`]): command lines and
//!   response lines
//! - **Session** ([`protocol::Session`]): one TCP connection, one request in
//!   flight, response timeouts, unsolicited updates
//! - **Supervisor** ([`supervisor::ConnectionSupervisor`]): reconnection with
//!   exponential backoff and periodic health checks
//! - **Controller** ([`controller::PowerController`]): on/off/toggle intents
//!   and power callbacks
//! - **Manager** ([`manager::ReceiverManager`]): several receivers, a
//!   persisted `devices.json` and a shared event bus
//! - **Discovery** ([`discovery::discover`]): receivers announced over mDNS
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nad_telnet::controller::PowerController;
//! use nad_telnet::supervisor::{ConnectionSupervisor, SupervisorConfig};
//! use nad_telnet::{Endpoint, PowerState, Subscribable};
//!
//! #[tokio::main]
//! async fn main() -> nad_telnet::Result<()> {
//!     let endpoint: Endpoint = "192.168.1.10".parse()?;
//!     let supervisor = ConnectionSupervisor::new(endpoint, SupervisorConfig::default());
//!     supervisor.start();
//!
//!     let controller = Arc::new(PowerController::new(supervisor.clone()));
//!     let _forwarder = controller.spawn_state_forwarder(supervisor.state().watch());
//!
//!     controller.on_power_changed(|power: PowerState| {
//!         println!("Receiver is now {power}");
//!     });
//!
//!     controller.turn_on().await?;
//!     supervisor.shutdown();
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod event;
pub mod manager;
pub mod platform;
pub mod protocol;
pub mod response;
pub mod state;
pub mod subscription;
pub mod supervisor;
pub mod types;

pub use command::{Command, Operation, PowerCommand};
pub use config::{ConfigStore, DeviceConfig};
pub use controller::PowerController;
pub use discovery::DiscoveredReceiver;
pub use error::{
    CommandError, ConfigError, Error, ParseError, ProtocolError, Result, ValueError,
};
pub use event::{DeviceEvent, DeviceId, EventBus};
pub use manager::ReceiverManager;
pub use platform::{CommandStatus, Entity, EntityState, PowerIntent};
pub use protocol::{PowerLink, Session, SessionConfig, SessionEvent};
pub use response::Response;
pub use state::{DeviceState, StateCell, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use supervisor::{
    ConnectionState, ConnectionSupervisor, ReconnectionPolicy, SupervisorConfig,
};
pub use types::{Endpoint, PowerState};
