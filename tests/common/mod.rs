// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted NAD receiver listening on localhost.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use nad_telnet::Endpoint;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// `IAC WILL ECHO IAC WILL SUPPRESS-GO-AHEAD`
pub const NEGOTIATION: &[u8] = &[255, 251, 1, 255, 251, 3];

#[derive(Debug, Clone)]
enum Control {
    Push(String),
    Kick,
}

struct Shared {
    power: Mutex<String>,
    lines: Mutex<Vec<String>>,
    silent: AtomicBool,
    overlapped: AtomicBool,
    connections: AtomicUsize,
    terminator: &'static str,
    greeting: Vec<u8>,
    reply_delay: Duration,
    set_reply_parameter: String,
}

pub struct FakeReceiverBuilder {
    power: String,
    terminator: &'static str,
    greeting: Vec<u8>,
    reply_delay: Duration,
    set_reply_parameter: String,
}

impl FakeReceiverBuilder {
    pub fn power(mut self, power: &str) -> Self {
        self.power = power.to_string();
        self
    }

    pub fn terminator(mut self, terminator: &'static str) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn greeting(mut self, greeting: &[u8]) -> Self {
        self.greeting = greeting.to_vec();
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Parameter named in the reply to `Main.Power=`, as a confused firmware
    /// might answer `Main.Pwr=On`.
    pub fn set_reply_parameter(mut self, parameter: &str) -> Self {
        self.set_reply_parameter = parameter.to_string();
        self
    }

    pub async fn start(self) -> FakeReceiver {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (control, _) = broadcast::channel(16);

        let shared = Arc::new(Shared {
            power: Mutex::new(self.power),
            lines: Mutex::new(Vec::new()),
            silent: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            connections: AtomicUsize::new(0),
            terminator: self.terminator,
            greeting: self.greeting,
            reply_delay: self.reply_delay,
            set_reply_parameter: self.set_reply_parameter,
        });

        let task = {
            let shared = Arc::clone(&shared);
            let control = control.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, Arc::clone(&shared), control.subscribe()));
                }
            })
        };

        FakeReceiver {
            endpoint: Endpoint::new("127.0.0.1", port).unwrap(),
            shared,
            control,
            task,
        }
    }
}

pub struct FakeReceiver {
    pub endpoint: Endpoint,
    shared: Arc<Shared>,
    control: broadcast::Sender<Control>,
    task: JoinHandle<()>,
}

impl FakeReceiver {
    pub fn builder() -> FakeReceiverBuilder {
        FakeReceiverBuilder {
            power: "On".to_string(),
            terminator: "\r\n",
            greeting: Vec::new(),
            reply_delay: Duration::ZERO,
            set_reply_parameter: "Power".to_string(),
        }
    }

    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn power(&self) -> String {
        self.shared.power.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.shared.lines.lock().clone()
    }

    pub fn count_lines(&self, line: &str) -> usize {
        self.shared.lines.lock().iter().filter(|l| *l == line).count()
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Stops answering, as a receiver that hangs would.
    pub fn set_silent(&self, silent: bool) {
        self.shared.silent.store(silent, Ordering::SeqCst);
    }

    /// Returns `true` if a command arrived while a reply was still pending.
    pub fn saw_overlap(&self) -> bool {
        self.shared.overlapped.load(Ordering::SeqCst)
    }

    /// Writes an unsolicited line to every open connection.
    pub fn push(&self, line: &str) {
        let _ = self.control.send(Control::Push(line.to_string()));
    }

    /// Closes every open connection.
    pub fn kick(&self) {
        let _ = self.control.send(Control::Kick);
    }
}

impl Drop for FakeReceiver {
    fn drop(&mut self) {
        self.task.abort();
        self.kick();
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    shared: Arc<Shared>,
    mut control: broadcast::Receiver<Control>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut pending: VecDeque<String> = VecDeque::new();

    if !shared.greeting.is_empty() && write_half.write_all(&shared.greeting).await.is_err() {
        return;
    }

    loop {
        let line = if let Some(line) = pending.pop_front() {
            line
        } else {
            tokio::select! {
                message = control.recv() => match message {
                    Ok(Control::Push(line)) => {
                        let out = format!("{line}{}", shared.terminator);
                        if write_half.write_all(out.as_bytes()).await.is_err() {
                            return;
                        }
                        continue;
                    }
                    Ok(Control::Kick) | Err(_) => return,
                },
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    _ => return,
                },
            }
        };

        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        shared.lines.lock().push(line.clone());

        if shared.silent.load(Ordering::SeqCst) {
            continue;
        }
        let Some(reply) = answer(&shared, &line) else {
            continue;
        };

        if !shared.reply_delay.is_zero() {
            if let Ok(Ok(Some(next))) =
                tokio::time::timeout(shared.reply_delay, lines.next_line()).await
            {
                shared.overlapped.store(true, Ordering::SeqCst);
                pending.push_back(next);
            }
        }

        let out = format!("{reply}{}", shared.terminator);
        if write_half.write_all(out.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn answer(shared: &Shared, line: &str) -> Option<String> {
    if line.eq_ignore_ascii_case("Main.Power?") {
        return Some(format!("Main.Power={}", shared.power.lock()));
    }
    if let Some(value) = line.strip_prefix("Main.Power=") {
        *shared.power.lock() = value.to_string();
        return Some(format!("Main.{}={value}", shared.set_reply_parameter));
    }
    None
}

/// Polls `condition` every 10ms until it holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
