// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session tests against a scripted receiver on localhost.

mod common;

use std::time::Duration;

use common::{FakeReceiver, NEGOTIATION};
use nad_telnet::{Error, PowerState, ProtocolError, Session, SessionConfig, SessionEvent, StateCell};

fn config() -> SessionConfig {
    SessionConfig::new()
        .with_response_timeout(Duration::from_millis(300))
        .with_connect_timeout(Duration::from_secs(2))
}

async fn connect(receiver: &FakeReceiver) -> (Session, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
    Session::connect(receiver.endpoint.clone(), &config(), StateCell::new())
        .await
        .unwrap()
}

async fn wait_for_power(session: &Session, power: PowerState) {
    let mut rx = session.state().watch();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.power() == power))
        .await
        .expect("power state not reached")
        .unwrap();
}

#[tokio::test]
async fn connect_queries_power() {
    let receiver = FakeReceiver::builder().power("On").start().await;
    let (session, _events) = connect(&receiver).await;

    let state = session.state().snapshot();
    assert!(state.is_connected());
    assert_eq!(state.power(), PowerState::On);
    assert!(state.last_updated().is_some());
    assert_eq!(receiver.lines(), ["Main.Power?"]);

    session.shutdown();
}

#[tokio::test]
async fn set_power_waits_for_echo() {
    let receiver = FakeReceiver::builder().power("Off").start().await;
    let (session, _events) = connect(&receiver).await;
    assert_eq!(session.get_power(), PowerState::Off);

    assert_eq!(session.set_power(PowerState::On).await.unwrap(), PowerState::On);
    assert_eq!(session.get_power(), PowerState::On);
    assert_eq!(receiver.power(), "On");

    session.shutdown();
}

#[tokio::test]
async fn set_power_rejects_unknown() {
    let receiver = FakeReceiver::start().await;
    let (session, _events) = connect(&receiver).await;

    let err = session.set_power(PowerState::Unknown).await.unwrap_err();
    assert!(matches!(err, Error::Value(_)));
    assert_eq!(receiver.count_lines("Main.Power=Unknown"), 0);

    session.shutdown();
}

#[tokio::test]
async fn one_request_in_flight_at_a_time() {
    let receiver = FakeReceiver::builder()
        .reply_delay(Duration::from_millis(40))
        .start()
        .await;
    let (session, _events) = connect(&receiver).await;

    let mut tasks = Vec::new();
    for i in 0..5 {
        let session = session.clone();
        let target = if i % 2 == 0 { PowerState::On } else { PowerState::Off };
        tasks.push(tokio::spawn(async move { session.set_power(target).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(!receiver.saw_overlap());
    assert_eq!(receiver.lines().len(), 6);

    session.shutdown();
}

#[tokio::test]
async fn unanswered_command_times_out() {
    let receiver = FakeReceiver::start().await;
    let (session, mut events) = connect(&receiver).await;

    let err = session.set("Pwr", "On").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::ResponseTimeout(300))
    ));

    match events.recv().await {
        Some(SessionEvent::ResponseTimeout(command)) => assert_eq!(command.parameter(), "Pwr"),
        other => panic!("unexpected event: {other:?}"),
    }

    // the session stays usable after a timeout
    assert_eq!(session.refresh_power().await.unwrap(), PowerState::On);
    session.shutdown();
}

#[tokio::test]
async fn reply_for_other_parameter_does_not_complete_set() {
    let receiver = FakeReceiver::builder()
        .power("Off")
        .set_reply_parameter("Pwr")
        .start()
        .await;
    let (session, _events) = connect(&receiver).await;
    assert_eq!(session.get_power(), PowerState::Off);

    let err = session.set_power(PowerState::On).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::ResponseTimeout(300))
    ));
    assert_eq!(receiver.count_lines("Main.Power=On"), 1);
    assert_eq!(session.get_power(), PowerState::Off);

    session.shutdown();
}

#[tokio::test]
async fn peer_close_fails_pending_requests() {
    let receiver = FakeReceiver::start().await;
    let (session, mut events) = connect(&receiver).await;
    receiver.set_silent(true);

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let session = session.clone();
        tasks.push(tokio::spawn(async move { session.refresh_power().await }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    receiver.kick();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_connection_lost(), "unexpected error: {err}");
    }

    assert!(matches!(
        events.recv().await,
        Some(SessionEvent::ConnectionLost(_))
    ));
    assert!(session.is_closed());
    assert!(!session.state().snapshot().is_connected());

    let err = session.refresh_power().await.unwrap_err();
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn unsolicited_power_update_is_applied() {
    let receiver = FakeReceiver::start().await;
    let (session, _events) = connect(&receiver).await;
    assert_eq!(session.get_power(), PowerState::On);

    receiver.push("Main.Power=Off");
    wait_for_power(&session, PowerState::Off).await;

    // unrelated and malformed lines are ignored
    receiver.push("Main.Volume=-20");
    receiver.push("garbage");
    receiver.push("Main.Power=On");
    wait_for_power(&session, PowerState::On).await;

    session.shutdown();
}

#[tokio::test]
async fn carriage_return_terminated_replies() {
    let receiver = FakeReceiver::builder()
        .terminator("\r")
        .power("Off")
        .start()
        .await;
    let (session, _events) = connect(&receiver).await;

    assert_eq!(session.get_power(), PowerState::Off);
    assert_eq!(session.set_power(PowerState::On).await.unwrap(), PowerState::On);

    session.shutdown();
}

#[tokio::test]
async fn telnet_negotiation_is_ignored() {
    let receiver = FakeReceiver::builder().greeting(NEGOTIATION).start().await;
    let (session, _events) = connect(&receiver).await;

    assert_eq!(session.get_power(), PowerState::On);
    assert_eq!(session.refresh_power().await.unwrap(), PowerState::On);

    session.shutdown();
}

#[tokio::test]
async fn shutdown_is_not_reported_as_loss() {
    let receiver = FakeReceiver::start().await;
    let (session, mut events) = connect(&receiver).await;

    session.shutdown();
    assert!(events.recv().await.is_none());
    assert!(session.is_closed());
    assert!(!session.state().snapshot().is_connected());
    assert_eq!(session.get_power(), PowerState::On);
}
