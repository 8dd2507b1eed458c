//! Demo device bodies for the sampler → processor → sink pipeline.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mqpipe_core::{config, Result};
use mqpipe_runtime::{Controller, Mailbox, Message, UserLogic};

/// How fast the demo sampler emits payloads.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

// ----------------------------------------------------------------------------
// Sampler
// ----------------------------------------------------------------------------

/// Emits numbered payloads on the `data1` channel.
pub struct Sampler {
    count: usize,
    data: Mutex<Option<Mailbox>>,
}

impl Sampler {
    /// `count` bounds the number of payloads; zero means unlimited.
    pub fn new(count: usize) -> Self {
        Self {
            count,
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
        let data = self.data.lock().unwrap().clone().ok_or_else(not_initialized)?;
        let done = ctl.done();

        let mut i = 0usize;
        loop {
            if self.count > 0 && i >= self.count {
                ctl.info(format!("emitted {i} payloads, idling"));
                done.fired().await;
                return Ok(());
            }
            let msg = Message::new(format!("DATA-{i:04}").into_bytes());
            tokio::select! {
                _ = done.fired() => return Ok(()),
                res = data.send(msg) => res?,
            }
            i += 1;
            tokio::select! {
                _ = done.fired() => return Ok(()),
                _ = tokio::time::sleep(SAMPLE_INTERVAL) => {}
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Processor
// ----------------------------------------------------------------------------

/// Tags payloads from `data1` with the device name and forwards them on
/// `data2`.
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

        loop {
            let msg = tokio::select! {
                _ = done.fired() => return Ok(()),
                msg = input.recv() => msg?,
            };
            let mut out = msg.payload.to_vec();
            out.extend_from_slice(format!(" (via {name})").as_bytes());
            tokio::select! {
                _ = done.fired() => return Ok(()),
                res = output.send(Message::new(out)) => res?,
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Sink
// ----------------------------------------------------------------------------

/// Logs every payload arriving on `data2`.
#[derive(Default)]
pub struct Sink {
    data: Mutex<Option<Mailbox>>,
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

        let mut received = 0u64;
        loop {
            let msg = tokio::select! {
                _ = done.fired() => {
                    ctl.info(format!("received {received} payloads"));
                    return Ok(());
                }
                msg = data.recv() => msg?,
            };
            received += 1;
            ctl.info(String::from_utf8_lossy(&msg.payload).into_owned());
        }
    }
}

fn not_initialized() -> mqpipe_core::Error {
    mqpipe_core::Error::logic("device was not initialized")
}
