//! Shared fixtures: a sampler → processor → sink topology and the user
//! logic driving it.

// Each integration-test binary pulls in the subset it needs.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use mqpipe_core::config::{Channel, Device, Options, Socket};
use mqpipe_core::{config, Config, Result};
use mqpipe_runtime::{Controller, Mailbox, Message, UserLogic};

/// Ask the OS for a free TCP port.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe socket");
    listener.local_addr().expect("probe address").port()
}

fn socket(kind: &str, method: &str, address: String) -> Socket {
    Socket {
        kind: kind.to_owned(),
        method: method.to_owned(),
        address,
        ..Default::default()
    }
}

/// The three-device pipeline topology: sampler1 pushes on `data1`,
/// processor pulls `data1` and pushes `data2`, sink1 pulls `data2`.
pub fn sps_config(transport: &str, port1: u16, port2: u16) -> Config {
    Config {
        id: String::new(),
        transport: transport.to_owned(),
        control: "interactive".to_owned(),
        options: Options {
            devices: vec![
                Device {
                    id: "sampler1".to_owned(),
                    key: String::new(),
                    channels: vec![Channel {
                        name: "data1".to_owned(),
                        sockets: vec![socket("push", "bind", format!("tcp://*:{port1}"))],
                    }],
                },
                Device {
                    id: String::new(),
                    key: "processor".to_owned(),
                    channels: vec![
                        Channel {
                            name: "data1".to_owned(),
                            sockets: vec![socket(
                                "pull",
                                "connect",
                                format!("tcp://127.0.0.1:{port1}"),
                            )],
                        },
                        Channel {
                            name: "data2".to_owned(),
                            sockets: vec![socket(
                                "push",
                                "connect",
                                format!("tcp://127.0.0.1:{port2}"),
                            )],
                        },
                    ],
                },
                Device {
                    id: "sink1".to_owned(),
                    key: String::new(),
                    channels: vec![Channel {
                        name: "data2".to_owned(),
                        sockets: vec![socket("pull", "bind", format!("tcp://*:{port2}"))],
                    }],
                },
            ],
        },
    }
}

// ----------------------------------------------------------------------------
// Sampler
// ----------------------------------------------------------------------------

/// Emits `HELLO-00 … HELLO-(n-1)` on `data1`, then idles until stopped.
pub struct Sampler {
    n: usize,
    data: Mutex<Option<Mailbox>>,
}

impl Sampler {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            data: Mutex::new(None),
        }
    }
}

#[async_trait]
impl UserLogic for Sampler {
    async fn init(&self, ctl: Controller) -> Result<()> {
        *self.data.lock().unwrap() = Some(ctl.channel("data1", 0)?);
        Ok(())
    }

    async fn run(&self, ctl: Controller) -> Result<()> {
        let done = ctl.done();
        let data = self.data.lock().unwrap().clone();
        let Some(data) = data else {
            // Run before init: nothing to emit.
            done.fired().await;
            return Ok(());
        };

        for i in 0..self.n {
            let msg = Message::new(format!("HELLO-{i:02}").into_bytes());
            tokio::select! {
                _ = done.fired() => return Ok(()),
                res = data.send(msg) => res?,
            }
        }
        done.fired().await;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Processor
// ----------------------------------------------------------------------------

/// Appends ` (modified by <name> - <seq>)` to everything that arrives on
/// `data1` and forwards it on `data2`.
#[derive(Default)]
pub struct Processor {
    name: Mutex<String>,
    input: Mutex<Option<Mailbox>>,
    output: Mutex<Option<Mailbox>>,
}

#[async_trait]
impl UserLogic for Processor {
    async fn configure(&self, cfg: &config::Device) -> Result<()> {
        *self.name.lock().unwrap() = cfg.name().to_owned();
        Ok(())
    }

    async fn init(&self, ctl: Controller) -> Result<()> {
        *self.input.lock().unwrap() = Some(ctl.channel("data1", 0)?);
        *self.output.lock().unwrap() = Some(ctl.channel("data2", 0)?);
        Ok(())
    }

    async fn run(&self, ctl: Controller) -> Result<()> {
        let name = self.name.lock().unwrap().clone();
        let input = self.input.lock().unwrap().clone().ok_or_else(not_initialized)?;
        let output = self.output.lock().unwrap().clone().ok_or_else(not_initialized)?;
        let done = ctl.done();

        let mut i = 0usize;
        loop {
            let msg = tokio::select! {
                _ = done.fired() => return Ok(()),
                msg = input.recv() => msg?,
            };
            let mut out = msg.payload.to_vec();
            out.extend_from_slice(format!(" (modified by {name} - {i:02})").as_bytes());
            tokio::select! {
                _ = done.fired() => return Ok(()),
                res = output.send(Message::new(out)) => res?,
            }
            i += 1;
        }
    }
}

// ----------------------------------------------------------------------------
// Sink
// ----------------------------------------------------------------------------

/// Records `<payload> - <seq>` for everything that arrives on `data2`.
pub struct Sink {
    sum: flume::Sender<String>,
    data: Mutex<Option<Mailbox>>,
}

impl Sink {
    pub fn new(sum: flume::Sender<String>) -> Self {
        Self {
            sum,
            data: Mutex::new(None),
        }
    }
}

#[async_trait]
impl UserLogic for Sink {
    async fn init(&self, ctl: Controller) -> Result<()> {
        *self.data.lock().unwrap() = Some(ctl.channel("data2", 0)?);
        Ok(())
    }

    async fn run(&self, ctl: Controller) -> Result<()> {
        let data = self.data.lock().unwrap().clone().ok_or_else(not_initialized)?;
        let done = ctl.done();

        let mut i = 0usize;
        loop {
            let msg = tokio::select! {
                _ = done.fired() => return Ok(()),
                msg = data.recv() => msg?,
            };
            let text = String::from_utf8_lossy(&msg.payload).into_owned();
            let _ = self.sum.send_async(format!("{text} - {i:02}")).await;
            i += 1;
        }
    }
}

fn not_initialized() -> mqpipe_core::Error {
    mqpipe_core::Error::logic("device was not initialized")
}
