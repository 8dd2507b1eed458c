//! The contract between a device and its user-supplied logic.

use async_trait::async_trait;

use mqpipe_core::{config, Result};

use crate::device::Controller;

/// Device behavior supplied by the application.
///
/// Only [`run`](UserLogic::run) is required; the remaining hooks default to
/// no-ops so implementations override exactly what they need. All methods
/// take `&self`: `run` executes concurrently with the dispatch-driven hooks,
/// so implementations keep their mutable state behind interior mutability
/// and document their own thread-safety.
#[async_trait]
pub trait UserLogic: Send + Sync {
    /// The device's main activity. Must loop until the controller's done
    /// signal fires.
    async fn run(&self, ctl: Controller) -> Result<()>;

    /// Receive the device descriptor before the channels start. The typical
    /// implementation retains what it needs (the device name, channel
    /// parameters).
    async fn configure(&self, _cfg: &config::Device) -> Result<()> {
        Ok(())
    }

    /// One-time initialization after `InitDevice`; the typical
    /// implementation resolves its mailboxes by channel name and index.
    async fn init(&self, _ctl: Controller) -> Result<()> {
        Ok(())
    }

    /// Invoked on `Pause`.
    async fn pause(&self, _ctl: Controller) -> Result<()> {
        Ok(())
    }

    /// Invoked on `ResetTask`.
    async fn reset(&self, _ctl: Controller) -> Result<()> {
        Ok(())
    }
}
