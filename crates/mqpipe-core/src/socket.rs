//! Socket and driver abstractions.
//!
//! These traits are the seam between the device runtime and the concrete
//! message-queue libraries. Driver crates implement both; the runtime only
//! ever sees trait objects handed out by the registry.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::socket_type::SocketType;

/// A typed message-queue endpoint.
///
/// Methods take `&self`: a socket is shared between a channel's sender pump,
/// receiver pump, and control loop, so implementations synchronize
/// internally. Exactly one of [`listen`](Socket::listen) or
/// [`dial`](Socket::dial) is called per socket. [`close`](Socket::close) is
/// idempotent; any operation after close fails with
/// [`TransportError::Closed`].
#[async_trait]
pub trait Socket: Send + Sync {
    /// The type this socket was created as.
    fn socket_type(&self) -> SocketType;

    /// Bind a local endpoint. Wildcard listener addresses
    /// (`tcp://*:PORT`, port `*`) are rewritten before binding.
    async fn listen(&self, addr: &str) -> Result<(), TransportError>;

    /// Connect to a remote endpoint. The address is used literally.
    async fn dial(&self, addr: &str) -> Result<(), TransportError>;

    /// Queue a payload for delivery. Blocks until the transport accepts it.
    async fn send(&self, data: Bytes) -> Result<(), TransportError>;

    /// Receive the next complete payload. Blocks until one arrives or the
    /// socket is closed.
    async fn recv(&self) -> Result<Bytes, TransportError>;

    /// Release the underlying resource, unblocking any pending operation.
    async fn close(&self);
}

/// A transport implementation that can mint [`Socket`]s.
///
/// Drivers are registered once by name in the [`registry`](crate::registry)
/// and shared process-wide.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The registry name of this driver.
    fn name(&self) -> &'static str;

    /// Create an unconnected socket of the requested type.
    ///
    /// Types the driver cannot express fail with
    /// [`TransportError::UnsupportedSocketType`].
    async fn open_socket(&self, typ: SocketType) -> Result<Arc<dyn Socket>, TransportError>;
}

impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("name", &self.name()).finish()
    }
}
