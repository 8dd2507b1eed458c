//! mqpipe Device Runtime
//!
//! This crate runs devices: long-lived processes that own named channels,
//! exchange opaque payloads with peer processes through message-queue
//! sockets, and are driven by an external command source through a small
//! state machine.
//!
//! A device implementation looks like this:
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use mqpipe_runtime::{Controller, Message, UserLogic};
//! use mqpipe_core::Result;
//!
//! struct Doubler {
//!     data: std::sync::Mutex<Option<mqpipe_runtime::Mailbox>>,
//! }
//!
//! #[async_trait]
//! impl UserLogic for Doubler {
//!     async fn init(&self, ctl: Controller) -> Result<()> {
//!         *self.data.lock().unwrap() = Some(ctl.channel("data", 0)?);
//!         Ok(())
//!     }
//!
//!     async fn run(&self, ctl: Controller) -> Result<()> {
//!         let data = self.data.lock().unwrap().clone().expect("init ran");
//!         let done = ctl.done();
//!         loop {
//!             tokio::select! {
//!                 _ = done.fired() => return Ok(()),
//!                 msg = data.recv() => {
//!                     let msg = msg?;
//!                     let doubled = [&msg.payload[..], &msg.payload[..]].concat();
//!                     data.send(Message::new(doubled)).await?;
//!                 }
//!             }
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let logic = Doubler { data: Default::default() };
//!     if let Err(e) = mqpipe_runtime::launch(logic).await {
//!         eprintln!("{e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```
//!
//! Only [`UserLogic::run`] is mandatory; `configure`, `init`, `pause` and
//! `reset` default to no-ops. `run` must keep looping until the
//! [`Controller`]'s done signal fires.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod channel;
mod input;

pub mod command;
pub mod device;
pub mod logic;
pub mod mailbox;
pub mod orchestrator;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use command::Command;
pub use device::{CommandQueue, Controller, Device, DoneSignal};
pub use logic::UserLogic;
pub use mailbox::Mailbox;
pub use orchestrator::{
    broadcast, launch, launch_with, register_default_drivers, run_device, Flags,
};

// Re-exported so device implementations only need this crate in scope.
pub use mqpipe_core::{Config, Error, Message, Result};
