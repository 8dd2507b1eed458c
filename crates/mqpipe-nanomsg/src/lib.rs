//! nanomsg-compatible transport driver.
//!
//! Implements the mqpipe [`Socket`] contract over the `nng` crate
//! (nanomsg-next-generation, wire-compatible with the nanomsg Scalability
//! Protocols). Every mqpipe socket type is supported: the extended pub/sub
//! types fall back to plain pub/sub and Dealer/Router fall back to Req/Rep,
//! which is how the SP protocol family expresses them. TCP, IPC and inproc
//! transports are all available natively.
//!
//! nng sockets are thread-safe handles with blocking send/recv, so the
//! driver clones the handle per operation and runs the blocking call on the
//! tokio blocking pool. Closing the socket unblocks any pending operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nng::options::protocol::pubsub::Subscribe;
use nng::options::Options;

use mqpipe_core::{address, registry, Driver, Socket, SocketType, TransportError};

const DRIVER_NAME: &str = "nanomsg";

const DIAL_RETRY_DELAY: Duration = Duration::from_millis(125);
const DIAL_RETRY_ATTEMPTS: usize = 40;

/// Register the driver under the name `"nanomsg"`.
pub fn register() {
    registry::register(DRIVER_NAME, Arc::new(NngDriver));
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// Factory for nng-backed sockets.
pub struct NngDriver;

fn protocol_for(typ: SocketType) -> nng::Protocol {
    match typ {
        SocketType::Sub | SocketType::XSub => nng::Protocol::Sub0,
        SocketType::Pub | SocketType::XPub => nng::Protocol::Pub0,
        SocketType::Push => nng::Protocol::Push0,
        SocketType::Pull => nng::Protocol::Pull0,
        SocketType::Req | SocketType::Dealer => nng::Protocol::Req0,
        SocketType::Rep | SocketType::Router => nng::Protocol::Rep0,
        SocketType::Pair => nng::Protocol::Pair1,
        SocketType::Bus => nng::Protocol::Bus0,
    }
}

#[async_trait]
impl Driver for NngDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    async fn open_socket(&self, typ: SocketType) -> Result<Arc<dyn Socket>, TransportError> {
        let inner = nng::Socket::new(protocol_for(typ))
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        if matches!(typ, SocketType::Sub | SocketType::XSub) {
            // Empty prefix: receive everything.
            inner
                .set_opt::<Subscribe>(Vec::new())
                .map_err(|e| TransportError::Setup(e.to_string()))?;
        }

        Ok(Arc::new(NngSocket {
            typ,
            inner,
            closed: AtomicBool::new(false),
        }))
    }
}

// ----------------------------------------------------------------------------
// Socket
// ----------------------------------------------------------------------------

/// An nng-backed socket.
pub struct NngSocket {
    typ: SocketType,
    inner: nng::Socket,
    closed: AtomicBool,
}

impl NngSocket {
    fn guard_open(&self) -> Result<nng::Socket, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        Ok(self.inner.clone())
    }
}

fn is_retryable_dial(err: &nng::Error) -> bool {
    matches!(
        err,
        nng::Error::ConnectionRefused
            | nng::Error::ConnectionReset
            | nng::Error::ConnectionAborted
            | nng::Error::DestUnreachable
            | nng::Error::TimedOut
    )
}

#[async_trait]
impl Socket for NngSocket {
    fn socket_type(&self) -> SocketType {
        self.typ
    }

    async fn listen(&self, addr: &str) -> Result<(), TransportError> {
        let addr = address::listen_addr(addr);
        address::unlink_ipc(&addr);

        let sck = self.guard_open()?;
        let bind_addr = addr.clone();
        let res = tokio::task::spawn_blocking(move || sck.listen(&bind_addr)).await;
        flatten(res).map_err(|e| TransportError::Bind {
            addr,
            reason: e.to_string(),
        })
    }

    async fn dial(&self, addr: &str) -> Result<(), TransportError> {
        for attempt in 0.. {
            let sck = self.guard_open()?;
            let dial_addr = addr.to_owned();
            let res = tokio::task::spawn_blocking(move || sck.dial(&dial_addr)).await;
            match flatten(res) {
                Ok(()) => return Ok(()),
                Err(e) if is_retryable_dial(&e) && attempt + 1 < DIAL_RETRY_ATTEMPTS => {
                    tracing::debug!(addr, attempt, error = %e, "dial retry");
                    tokio::time::sleep(DIAL_RETRY_DELAY).await;
                }
                Err(e) => {
                    return Err(TransportError::Dial {
                        addr: addr.to_owned(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        unreachable!("dial retry loop returns from its last attempt")
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        let sck = self.guard_open()?;
        let res = tokio::task::spawn_blocking(move || {
            let msg = nng::Message::from(&data[..]);
            sck.send(msg).map_err(|(_, e)| e)
        })
        .await;
        flatten(res).map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&self) -> Result<Bytes, TransportError> {
        let sck = self.guard_open()?;
        let res = tokio::task::spawn_blocking(move || sck.recv()).await;
        let msg = flatten(res).map_err(|e| TransportError::Recv(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&msg[..]))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.inner.clone().close();
        }
    }
}

/// Collapse a blocking-pool join result into the nng result it carries.
fn flatten<T>(res: Result<Result<T, nng::Error>, tokio::task::JoinError>) -> Result<T, nng::Error> {
    match res {
        Ok(inner) => inner,
        // The blocking pool never cancels our closures; a join failure means
        // the closure panicked, and that panic should not be swallowed.
        Err(join) => std::panic::resume_unwind(join.into_panic()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_socket_type_opens() {
        for typ in mqpipe_core::socket_type::ALL_SOCKET_TYPES {
            let sck = NngDriver.open_socket(typ).await.unwrap();
            assert_eq!(sck.socket_type(), typ);
            sck.close().await;
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sck = NngDriver.open_socket(SocketType::Pair).await.unwrap();
        sck.close().await;
        sck.close().await;
        assert!(matches!(
            sck.send(Bytes::from_static(b"x")).await,
            Err(TransportError::Closed)
        ));
        assert!(matches!(sck.recv().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_inproc_pair_round_trip() {
        let a = NngDriver.open_socket(SocketType::Pair).await.unwrap();
        let b = NngDriver.open_socket(SocketType::Pair).await.unwrap();

        a.listen("inproc://pair-round-trip").await.unwrap();
        b.dial("inproc://pair-round-trip").await.unwrap();

        b.send(Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(&a.recv().await.unwrap()[..], b"ping");

        a.send(Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(&b.recv().await.unwrap()[..], b"pong");

        a.close().await;
        b.close().await;
    }
}
