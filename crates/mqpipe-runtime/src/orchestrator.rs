//! Top-level entry points.
//!
//! [`launch`] is what device executables call from `main`: it parses the
//! command-line flags, loads the JSON topology, and drives a single device
//! from `InitDevice` through termination. [`run_device`] is the lower-level
//! entry used by tests and embedding applications; it takes an explicit
//! cancellation token, configuration, and control-input stream. Multi-device
//! in-process pipelines push commands to each device with [`broadcast`].

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;

use clap::Parser;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use mqpipe_core::{Config, ConfigError, Result};

use crate::command::Command;
use crate::device::{CommandQueue, Device};
use crate::logic::UserLogic;

/// Common command-line flags of a device executable.
#[derive(Debug, Clone, clap::Args)]
pub struct Flags {
    /// Device id to select from the configuration
    #[arg(long, default_value = "")]
    pub id: String,

    /// Transport mechanism to use (zeromq, nanomsg, ...)
    #[arg(long, default_value = "zeromq")]
    pub transport: String,

    /// Path to the JSON file holding the device configuration
    #[arg(long = "mq-config")]
    pub mq_config: Option<PathBuf>,

    /// Start the device in "interactive" or "static" control mode
    #[arg(long, default_value = "interactive")]
    pub control: String,
}

#[derive(Parser)]
struct FlagsOnly {
    #[command(flatten)]
    flags: Flags,
}

/// Register the built-in drivers ("zeromq", "nanomsg").
///
/// Callable any number of times; only the first call registers.
pub fn register_default_drivers() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        mqpipe_zeromq::register();
        mqpipe_nanomsg::register();
    });
}

/// Configure and run a device from the process command line.
pub async fn launch<L: UserLogic + 'static>(logic: L) -> Result<()> {
    let FlagsOnly { flags } = FlagsOnly::parse();
    launch_with(flags, logic).await
}

/// Configure and run a device from already-parsed flags.
///
/// The JSON document's root-level override fields win over the flags; a
/// missing control mode defaults to "static".
pub async fn launch_with<L: UserLogic + 'static>(flags: Flags, logic: L) -> Result<()> {
    let path = flags
        .mq_config
        .ok_or_else(|| ConfigError::Invalid("missing --mq-config".to_owned()))?;
    let mut cfg = Config::load(path)?;
    if cfg.id.is_empty() {
        cfg.id = flags.id;
    }
    if cfg.transport.is_empty() {
        cfg.transport = flags.transport;
    }
    if cfg.control.is_empty() {
        cfg.control = flags.control;
    }
    if cfg.control.is_empty() {
        cfg.control = "static".to_owned();
    }

    register_default_drivers();

    let cancel = CancellationToken::new();
    if cfg.control == "interactive" {
        run_device(&cancel, cfg, logic, tokio::io::stdin()).await
    } else {
        run_device(&cancel, cfg, logic, tokio::io::empty()).await
    }
}

/// Construct a device and drive it through `InitDevice → Run → …` until
/// termination.
pub async fn run_device<L, R>(
    cancel: &CancellationToken,
    cfg: Config,
    logic: L,
    control_input: R,
) -> Result<()>
where
    L: UserLogic + 'static,
    R: AsyncRead + Send + Unpin + 'static,
{
    let device = Device::new(cancel, &cfg, Arc::new(logic), control_input).await?;
    let cmds = device.commands();
    cmds.push(Command::InitDevice);
    cmds.push(Command::Run);
    device.run().await
}

/// Forward a command to each device's queue, in order.
pub fn broadcast(cmd: Command, devices: &[&CommandQueue]) {
    for queue in devices {
        queue.push(cmd);
    }
}
