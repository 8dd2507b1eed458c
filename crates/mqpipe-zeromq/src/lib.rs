//! ZeroMQ transport driver.
//!
//! Implements the mqpipe [`Socket`] contract over the pure-Rust `zeromq`
//! crate. Supported socket types: Sub, Pub, Push, Pull, Req, Rep. Sub
//! sockets are subscribed to the empty prefix at creation, so they receive
//! everything their peers publish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use zeromq::{Socket as _, SocketRecv as _, SocketSend as _};

use mqpipe_core::{address, registry, Driver, Socket, SocketType, TransportError};

const DRIVER_NAME: &str = "zeromq";

/// How often a refused dial is retried, and for how many attempts. Peers in
/// a pipeline bind and connect in no particular order, so a connector has to
/// tolerate a listener that is not up yet.
const DIAL_RETRY_DELAY: Duration = Duration::from_millis(125);
const DIAL_RETRY_ATTEMPTS: usize = 40;

const SEND_RETRY_DELAY: Duration = Duration::from_millis(50);
const SEND_RETRY_ATTEMPTS: usize = 200;

/// Register the driver under the name `"zeromq"`.
pub fn register() {
    registry::register(DRIVER_NAME, Arc::new(ZmqDriver));
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// Factory for ZeroMQ-backed sockets.
pub struct ZmqDriver;

#[async_trait]
impl Driver for ZmqDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    async fn open_socket(&self, typ: SocketType) -> Result<Arc<dyn Socket>, TransportError> {
        let inner = match typ {
            SocketType::Pub => Inner::Pub(zeromq::PubSocket::new()),
            SocketType::Sub => {
                let mut sck = zeromq::SubSocket::new();
                sck.subscribe("")
                    .await
                    .map_err(|e| TransportError::Setup(e.to_string()))?;
                Inner::Sub(sck)
            }
            SocketType::Push => Inner::Push(zeromq::PushSocket::new()),
            SocketType::Pull => Inner::Pull(zeromq::PullSocket::new()),
            SocketType::Req => Inner::Req(zeromq::ReqSocket::new()),
            SocketType::Rep => Inner::Rep(zeromq::RepSocket::new()),
            other => return Err(TransportError::UnsupportedSocketType(other, DRIVER_NAME)),
        };

        Ok(Arc::new(ZmqSocket {
            typ,
            closed: CancellationToken::new(),
            inner: Mutex::new(Some(inner)),
        }))
    }
}

// ----------------------------------------------------------------------------
// Socket
// ----------------------------------------------------------------------------

enum Inner {
    Pub(zeromq::PubSocket),
    Sub(zeromq::SubSocket),
    Push(zeromq::PushSocket),
    Pull(zeromq::PullSocket),
    Req(zeromq::ReqSocket),
    Rep(zeromq::RepSocket),
}

/// A ZeroMQ-backed socket.
///
/// The inner socket lives behind a mutex so the handle can be shared between
/// a channel's pumps; `closed` lets `close` interrupt an operation that is
/// blocked inside the library.
pub struct ZmqSocket {
    typ: SocketType,
    closed: CancellationToken,
    inner: Mutex<Option<Inner>>,
}

impl ZmqSocket {
    async fn lock(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<Inner>>, TransportError> {
        tokio::select! {
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            guard = self.inner.lock() => Ok(guard),
        }
    }
}

#[async_trait]
impl Socket for ZmqSocket {
    fn socket_type(&self) -> SocketType {
        self.typ
    }

    async fn listen(&self, addr: &str) -> Result<(), TransportError> {
        let addr = address::listen_addr(addr);
        address::unlink_ipc(&addr);

        let mut guard = self.lock().await?;
        let inner = guard.as_mut().ok_or(TransportError::Closed)?;
        let res = match inner {
            Inner::Pub(s) => s.bind(&addr).await.map(drop),
            Inner::Sub(s) => s.bind(&addr).await.map(drop),
            Inner::Push(s) => s.bind(&addr).await.map(drop),
            Inner::Pull(s) => s.bind(&addr).await.map(drop),
            Inner::Req(s) => s.bind(&addr).await.map(drop),
            Inner::Rep(s) => s.bind(&addr).await.map(drop),
        };
        res.map_err(|e| TransportError::Bind {
            addr,
            reason: e.to_string(),
        })
    }

    async fn dial(&self, addr: &str) -> Result<(), TransportError> {
        for attempt in 0.. {
            {
                let mut guard = self.lock().await?;
                let inner = guard.as_mut().ok_or(TransportError::Closed)?;
                let res = match inner {
                    Inner::Pub(s) => s.connect(addr).await,
                    Inner::Sub(s) => s.connect(addr).await,
                    Inner::Push(s) => s.connect(addr).await,
                    Inner::Pull(s) => s.connect(addr).await,
                    Inner::Req(s) => s.connect(addr).await,
                    Inner::Rep(s) => s.connect(addr).await,
                };
                match res {
                    Ok(()) => return Ok(()),
                    Err(e) if attempt + 1 < DIAL_RETRY_ATTEMPTS => {
                        tracing::debug!(addr, attempt, error = %e, "dial retry");
                    }
                    Err(e) => {
                        return Err(TransportError::Dial {
                            addr: addr.to_owned(),
                            reason: e.to_string(),
                        })
                    }
                }
            }

            tokio::select! {
                _ = self.closed.cancelled() => return Err(TransportError::Closed),
                _ = tokio::time::sleep(DIAL_RETRY_DELAY) => {}
            }
        }
        unreachable!("dial retry loop returns from its last attempt")
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        if matches!(self.typ, SocketType::Sub | SocketType::Pull) {
            return Err(TransportError::InvalidOperation {
                typ: self.typ,
                op: "send",
            });
        }

        // A bound PUSH socket races its first sends against the peer's
        // connection handshake; retry briefly before declaring the send
        // failed. Native ZeroMQ blocks in the same situation.
        let mut attempt = 0;
        loop {
            let msg = zeromq::ZmqMessage::from(data.clone());
            let res = {
                let mut guard = self.lock().await?;
                let inner = guard.as_mut().ok_or(TransportError::Closed)?;

                let op = async {
                    match inner {
                        Inner::Pub(s) => s.send(msg).await,
                        Inner::Push(s) => s.send(msg).await,
                        Inner::Req(s) => s.send(msg).await,
                        Inner::Rep(s) => s.send(msg).await,
                        Inner::Sub(_) | Inner::Pull(_) => unreachable!("rejected above"),
                    }
                };

                tokio::select! {
                    _ = self.closed.cancelled() => return Err(TransportError::Closed),
                    res = op => res,
                }
            };

            match res {
                Ok(()) => return Ok(()),
                Err(e) if self.typ == SocketType::Push && attempt < SEND_RETRY_ATTEMPTS => {
                    tracing::debug!(attempt, error = %e, "send retry");
                    attempt += 1;
                    tokio::select! {
                        _ = self.closed.cancelled() => return Err(TransportError::Closed),
                        _ = tokio::time::sleep(SEND_RETRY_DELAY) => {}
                    }
                }
                Err(e) => return Err(TransportError::Send(e.to_string())),
            }
        }
    }

    async fn recv(&self) -> Result<Bytes, TransportError> {
        if matches!(self.typ, SocketType::Pub | SocketType::Push) {
            return Err(TransportError::InvalidOperation {
                typ: self.typ,
                op: "recv",
            });
        }

        let mut guard = self.lock().await?;
        let inner = guard.as_mut().ok_or(TransportError::Closed)?;

        let op = async {
            match inner {
                Inner::Sub(s) => s.recv().await,
                Inner::Pull(s) => s.recv().await,
                Inner::Req(s) => s.recv().await,
                Inner::Rep(s) => s.recv().await,
                Inner::Pub(_) | Inner::Push(_) => unreachable!("rejected above"),
            }
        };

        let msg = tokio::select! {
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            res = op => res.map_err(|e| TransportError::Recv(e.to_string()))?,
        };
        Ok(msg.get(0).cloned().unwrap_or_else(Bytes::new))
    }

    async fn close(&self) {
        self.closed.cancel();
        // Dropping the inner socket tears down its endpoints.
        self.inner.lock().await.take();
    }
}
