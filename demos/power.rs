// SPDX-License-Identifier: MPL-2.0

//! Test program: connect to a NAD receiver and run a power intent.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example power -- <host[:port]> <on|off|toggle|status>
//! ```
//!
//! # Example
//!
//! ```bash
//! cargo run --example power -- 192.168.1.10 toggle
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use nad_telnet::{
    ConnectionState, ConnectionSupervisor, Endpoint, Entity, PowerController, PowerIntent,
    Subscribable, SupervisorConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <host[:port]> <on|off|toggle|status>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example power -- 192.168.1.10 toggle");
        std::process::exit(1);
    }

    let endpoint: Endpoint = args[1].parse()?;
    let intent = match args[2].as_str() {
        "status" => None,
        other => Some(other.parse::<PowerIntent>()?),
    };

    println!("Connecting to {endpoint}...");
    let supervisor = ConnectionSupervisor::new(endpoint, SupervisorConfig::default());
    let controller = Arc::new(PowerController::new(supervisor.clone()));
    let _forwarder = controller.spawn_state_forwarder(supervisor.state().watch());

    controller.on_entity_state_changed(|state| println!("Entity state: {state}"));
    supervisor.start();

    let mut connection = supervisor.watch_connection();
    tokio::time::timeout(
        Duration::from_secs(10),
        connection.wait_for(ConnectionState::is_connected),
    )
    .await??;
    println!("Connected! Power is {}", supervisor.state().snapshot().power());

    if let Some(intent) = intent {
        controller.on_command(intent).await?;
        println!("{intent} done, power is now {}", controller.power());
    }

    // give pushed updates a moment to arrive
    tokio::time::sleep(Duration::from_secs(2)).await;

    supervisor.shutdown();
    println!("Done.");
    Ok(())
}
