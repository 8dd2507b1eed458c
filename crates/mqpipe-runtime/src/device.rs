//! Device: channels plus a command-driven state machine.
//!
//! A device is constructed from a validated configuration and a user-logic
//! object. Construction opens the driver, builds the channels, and spawns
//! two long-lived side tasks: the interactive input scanner and the dispatch
//! loop. `run` then starts the channel machinery and waits for the first
//! termination cause.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use mqpipe_core::{config, registry, Config, ConfigError, Error, Result};

use crate::channel::{Channel, QuitSender};
use crate::command::Command;
use crate::input;
use crate::logic::UserLogic;
use crate::mailbox::Mailbox;

// ----------------------------------------------------------------------------
// Controller
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MailboxKey {
    name: String,
    index: usize,
}

/// The capability a device hands to its user logic: mailbox lookup, the done
/// signal, and device-scoped logging.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerShared>,
}

struct ControllerShared {
    device: String,
    mailboxes: HashMap<MailboxKey, Mailbox>,
    done: CancellationToken,
}

impl Controller {
    /// Look up the mailbox registered under `(name, index)`.
    pub fn channel(&self, name: &str, index: usize) -> Result<Mailbox> {
        let key = MailboxKey {
            name: name.to_owned(),
            index,
        };
        self.inner.mailboxes.get(&key).cloned().ok_or_else(|| {
            ConfigError::NoSuchChannel {
                name: name.to_owned(),
                index,
            }
            .into()
        })
    }

    /// The one-shot notification that tells `run` to exit.
    pub fn done(&self) -> DoneSignal {
        DoneSignal {
            token: self.inner.done.clone(),
        }
    }

    /// The device's resolved name.
    pub fn device_name(&self) -> &str {
        &self.inner.device
    }

    /// Log an informational message attributed to the device.
    pub fn info(&self, msg: impl std::fmt::Display) {
        tracing::info!(device = %self.inner.device, "{msg}");
    }

    /// Log an error attributed to the device.
    pub fn error(&self, msg: impl std::fmt::Display) {
        tracing::error!(device = %self.inner.device, "{msg}");
    }
}

/// Awaitable end-of-run notification.
///
/// The signal latches: once delivered, every present and future waiter
/// observes it immediately, so `Stop` cannot race a `run` task that has not
/// started waiting yet.
#[derive(Clone)]
pub struct DoneSignal {
    token: CancellationToken,
}

impl DoneSignal {
    /// Wait until the device has been told to stop.
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }

    /// Non-blocking check of the same condition.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ----------------------------------------------------------------------------
// Device
// ----------------------------------------------------------------------------

/// A handle for pushing commands onto a device's command queue.
///
/// Pushes are ordered and never block; a push after the device has
/// terminated is dropped.
#[derive(Clone)]
pub struct CommandQueue(mpsc::UnboundedSender<Command>);

impl CommandQueue {
    pub fn push(&self, cmd: Command) {
        let _ = self.0.send(cmd);
    }
}

/// A process-local aggregate of channels, driven by commands.
pub struct Device {
    name: String,
    cfg: config::Device,
    channels: Vec<Channel>,
    logic: Arc<dyn UserLogic>,
    cmd_queue: CommandQueue,
    quit_tx: QuitSender,
    quit_rx: mpsc::UnboundedReceiver<Result<()>>,
    done: CancellationToken,
    cancel: CancellationToken,
}

impl Device {
    /// Construct a device from the descriptor in `cfg` whose name matches
    /// `cfg.id`, wiring `control_input` to the interactive command scanner.
    pub async fn new<R>(
        cancel: &CancellationToken,
        cfg: &Config,
        logic: Arc<dyn UserLogic>,
        control_input: R,
    ) -> Result<Device>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let driver = registry::open(&cfg.transport)?;
        let dcfg = cfg
            .options
            .device(&cfg.id)
            .cloned()
            .ok_or_else(|| ConfigError::NoSuchDevice(cfg.id.clone()))?;
        let name = dcfg.name().to_owned();
        tracing::info!(device = %name, transport = %cfg.transport, "new device");

        let cancel = cancel.child_token();
        let done = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (quit_tx, quit_rx) = mpsc::unbounded_channel();

        let mut channels = Vec::with_capacity(dcfg.channels.len());
        let mut mailboxes = HashMap::new();
        for ch_cfg in &dcfg.channels {
            let ch = Channel::new(&driver, &name, ch_cfg).await?;
            mailboxes.insert(
                MailboxKey {
                    name: ch.name.clone(),
                    index: 0,
                },
                ch.mailbox.clone(),
            );
            channels.push(ch);
        }

        let controller = Controller {
            inner: Arc::new(ControllerShared {
                device: name.clone(),
                mailboxes,
                done: done.clone(),
            }),
        };

        input::spawn_scanner(
            control_input,
            name.clone(),
            cmd_tx.clone(),
            quit_tx.clone(),
            cancel.clone(),
        );
        tokio::spawn(dispatch(
            cmd_rx,
            controller,
            logic.clone(),
            done.clone(),
            quit_tx.clone(),
            cancel.clone(),
        ));

        Ok(Device {
            name,
            cfg: dcfg,
            channels,
            logic,
            cmd_queue: CommandQueue(cmd_tx),
            quit_tx,
            quit_rx,
            done,
            cancel,
        })
    }

    /// The device's resolved name (descriptor key, else id).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle on the device's command queue.
    pub fn commands(&self) -> CommandQueue {
        self.cmd_queue.clone()
    }

    /// Drive the device until it terminates.
    ///
    /// Starts the per-channel bind/dial tasks and pumps, then waits for the
    /// first value on the quit queue: a user-logic error, a transport error,
    /// cancellation, or a clean end. Channels are told to stop and their
    /// sockets are closed before the cause is returned.
    pub async fn run(mut self) -> Result<()> {
        if let Err(e) = self.logic.configure(&self.cfg).await {
            return Err(e);
        }

        for ch in &self.channels {
            ch.spawn_endpoint(self.quit_tx.clone());
        }
        let mut controls = Vec::with_capacity(self.channels.len());
        for ch in &self.channels {
            controls.push(ch.start(self.quit_tx.clone(), self.cancel.clone()));
        }

        // First cause wins; anything later is teardown noise.
        let cause = self.quit_rx.recv().await.unwrap_or(Ok(()));

        for ch in &self.channels {
            let _ = ch.control().send(Command::End);
        }
        for handle in controls {
            let _ = handle.await;
        }
        self.done.cancel();
        self.cancel.cancel();

        match &cause {
            Ok(()) => tracing::info!(device = %self.name, "device ended"),
            Err(e) if e.is_cancelled() => {
                tracing::info!(device = %self.name, "device cancelled")
            }
            Err(e) => tracing::error!(device = %self.name, error = %e, "device failed"),
        }
        cause
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.done.cancel();
        self.cancel.cancel();
    }
}

// ----------------------------------------------------------------------------
// Dispatch Loop
// ----------------------------------------------------------------------------

/// Process commands in FIFO order until `End`, `Error`, or cancellation.
async fn dispatch(
    mut cmds: mpsc::UnboundedReceiver<Command>,
    ctl: Controller,
    logic: Arc<dyn UserLogic>,
    done: CancellationToken,
    quit: QuitSender,
    cancel: CancellationToken,
) {
    // Init runs under its own guard so initialization stays atomic even
    // though the run task is not serialized against it.
    let init_guard = Mutex::new(());

    loop {
        let cmd = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = quit.send(Err(Error::Cancelled));
                return;
            }
            cmd = cmds.recv() => match cmd {
                Some(cmd) => cmd,
                None => return,
            },
        };
        tracing::debug!(device = %ctl.device_name(), command = %cmd, "dispatch");

        match cmd {
            Command::InitDevice => {
                let _guard = init_guard.lock().await;
                if let Err(e) = logic.init(ctl.clone()).await {
                    let _ = quit.send(Err(e));
                }
            }
            Command::InitTask => {}
            Command::Run => {
                let logic = logic.clone();
                let ctl = ctl.clone();
                let quit = quit.clone();
                tokio::spawn(async move {
                    if let Err(e) = logic.run(ctl).await {
                        let _ = quit.send(Err(e));
                    }
                });
            }
            Command::Pause => {
                if let Err(e) = logic.pause(ctl.clone()).await {
                    let _ = quit.send(Err(e));
                }
            }
            Command::Stop => done.cancel(),
            Command::ResetTask => {
                if let Err(e) = logic.reset(ctl.clone()).await {
                    let _ = quit.send(Err(e));
                }
            }
            Command::ResetDevice => {}
            Command::End | Command::Error => {
                done.cancel();
                let _ = quit.send(Ok(()));
                return;
            }
        }
    }
}
