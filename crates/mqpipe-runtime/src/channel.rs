//! Channel engine.
//!
//! A channel owns exactly one socket and bridges it to a [`Mailbox`]. When a
//! device enters its run, every channel first binds or dials as configured,
//! then starts the pump tasks its socket-type class calls for, and finally
//! parks in a control loop that closes the socket on `End` or cancellation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mqpipe_core::{config, ConfigError, Driver, Error, Message, Result, Socket, SocketType};

use crate::command::Command;
use crate::mailbox::Mailbox;

/// Where fatal channel errors go: the owning device's quit queue.
pub(crate) type QuitSender = tokio::sync::mpsc::UnboundedSender<Result<()>>;

/// Which pump tasks a socket-type class needs.
///
/// One-directional types get a single pump. The extended pub/sub types and
/// the symmetric pair/bus types run both directions concurrently. The
/// request-reply types run a single strictly-alternating pump, because their
/// protocol already serializes send and receive; user logic drives the
/// ordering through the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpPlan {
    Sender,
    Receiver,
    Duplex,
    Request,
    Reply,
}

fn pump_plan(typ: SocketType) -> PumpPlan {
    match typ {
        SocketType::Pub | SocketType::Push => PumpPlan::Sender,
        SocketType::Sub | SocketType::Pull => PumpPlan::Receiver,
        SocketType::XPub | SocketType::XSub | SocketType::Pair | SocketType::Bus => {
            PumpPlan::Duplex
        }
        SocketType::Req | SocketType::Dealer => PumpPlan::Request,
        SocketType::Rep | SocketType::Router => PumpPlan::Reply,
    }
}

pub(crate) struct Channel {
    pub(crate) name: String,
    pub(crate) mailbox: Mailbox,
    typ: SocketType,
    label: String,
    socket: Arc<dyn Socket>,
    socket_cfg: config::Socket,
    ctl_tx: flume::Sender<Command>,
    ctl_rx: flume::Receiver<Command>,
}

impl Channel {
    /// Build a channel from its configuration.
    ///
    /// # Panics
    ///
    /// Panics when the channel does not have exactly one socket: aggregating
    /// several sockets under one channel is not supported, and a topology
    /// that asks for it is a programmer error.
    pub(crate) async fn new(
        driver: &Arc<dyn Driver>,
        device: &str,
        cfg: &config::Channel,
    ) -> Result<Channel> {
        if cfg.sockets.len() != 1 {
            panic!(
                "mqpipe: channel {:?} must have exactly one socket (got {})",
                cfg.name,
                cfg.sockets.len()
            );
        }

        let socket_cfg = cfg.sockets[0].clone();
        let typ = SocketType::from_name(&socket_cfg.kind);
        let socket = driver.open_socket(typ).await?;
        let mailbox = Mailbox::bounded(
            socket_cfg.snd_buf_size as usize,
            socket_cfg.rcv_buf_size as usize,
        );
        let (ctl_tx, ctl_rx) = flume::unbounded();

        Ok(Channel {
            name: cfg.name.clone(),
            label: format!("{device}.{}", cfg.name),
            typ,
            socket,
            socket_cfg,
            mailbox,
            ctl_tx,
            ctl_rx,
        })
    }

    /// The control input used to deliver `End`.
    pub(crate) fn control(&self) -> flume::Sender<Command> {
        self.ctl_tx.clone()
    }

    /// Bind or dial the socket in a side task, as configured. Errors become
    /// the device's termination cause.
    pub(crate) fn spawn_endpoint(&self, quit: QuitSender) -> JoinHandle<()> {
        let socket = self.socket.clone();
        let cfg = self.socket_cfg.clone();
        let label = self.label.clone();
        tokio::spawn(async move {
            let res: Result<()> = match cfg.method.to_ascii_lowercase().as_str() {
                "bind" => socket.listen(&cfg.address).await.map_err(Error::from),
                "connect" => socket.dial(&cfg.address).await.map_err(Error::from),
                other => Err(ConfigError::InvalidMethod(other.to_owned()).into()),
            };
            match res {
                Ok(()) => {
                    tracing::debug!(channel = %label, method = %cfg.method, address = %cfg.address, "endpoint ready");
                }
                Err(e) => {
                    let _ = quit.send(Err(e));
                }
            }
        })
    }

    /// Start the pump tasks and the control loop. The returned handle
    /// completes once the control loop has closed the socket.
    pub(crate) fn start(&self, quit: QuitSender, cancel: CancellationToken) -> JoinHandle<()> {
        match pump_plan(self.typ) {
            PumpPlan::Sender => {
                tokio::spawn(sender_pump(
                    self.socket.clone(),
                    self.mailbox.outbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
            }
            PumpPlan::Receiver => {
                tokio::spawn(receiver_pump(
                    self.socket.clone(),
                    self.mailbox.inbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
            }
            PumpPlan::Duplex => {
                tokio::spawn(sender_pump(
                    self.socket.clone(),
                    self.mailbox.outbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
                tokio::spawn(receiver_pump(
                    self.socket.clone(),
                    self.mailbox.inbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
            }
            PumpPlan::Request => {
                tokio::spawn(request_pump(
                    self.socket.clone(),
                    self.mailbox.outbound(),
                    self.mailbox.inbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
            }
            PumpPlan::Reply => {
                tokio::spawn(reply_pump(
                    self.socket.clone(),
                    self.mailbox.outbound(),
                    self.mailbox.inbound(),
                    quit.clone(),
                    cancel.clone(),
                ));
            }
        }

        let socket = self.socket.clone();
        let ctl_rx = self.ctl_rx.clone();
        let label = self.label.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    cmd = ctl_rx.recv_async() => match cmd {
                        Ok(Command::End) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
            }
            socket.close().await;
            tracing::debug!(channel = %label, "socket closed");
        })
    }
}

// ----------------------------------------------------------------------------
// Pumps
// ----------------------------------------------------------------------------

fn fatal(quit: &QuitSender, cancel: &CancellationToken, err: Error) {
    // During teardown the socket close makes pending operations fail;
    // those are not the device's termination cause.
    if !cancel.is_cancelled() {
        let _ = quit.send(Err(err));
    }
}

/// Mailbox → socket. Empty payloads are skipped; a send error is fatal.
async fn sender_pump(
    socket: Arc<dyn Socket>,
    out: flume::Receiver<Message>,
    quit: QuitSender,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return,
            res = out.recv_async() => match res {
                Ok(msg) => msg,
                Err(_) => return,
            },
        };
        if msg.payload.is_empty() {
            continue;
        }
        if let Err(e) = socket.send(msg.payload).await {
            fatal(&quit, &cancel, e.into());
            return;
        }
    }
}

/// Socket → mailbox. Each result is enqueued, errors as error-marked
/// messages; a receive error is fatal.
async fn receiver_pump(
    socket: Arc<dyn Socket>,
    inbound: flume::Sender<Message>,
    quit: QuitSender,
    cancel: CancellationToken,
) {
    loop {
        let res = tokio::select! {
            _ = cancel.cancelled() => return,
            res = socket.recv() => res,
        };
        match res {
            Ok(payload) => {
                let delivered = tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = inbound.send_async(Message::new(payload)) => sent,
                };
                if delivered.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = inbound.try_send(Message::from_error(e.to_string()));
                fatal(&quit, &cancel, e.into());
                return;
            }
        }
    }
}

/// Strict request-reply alternation for Req/Dealer sockets: one outbound
/// message goes to the wire, then its reply comes back to the mailbox.
async fn request_pump(
    socket: Arc<dyn Socket>,
    out: flume::Receiver<Message>,
    inbound: flume::Sender<Message>,
    quit: QuitSender,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return,
            res = out.recv_async() => match res {
                Ok(msg) => msg,
                Err(_) => return,
            },
        };
        if msg.payload.is_empty() {
            continue;
        }
        if let Err(e) = socket.send(msg.payload).await {
            fatal(&quit, &cancel, e.into());
            return;
        }

        let reply = tokio::select! {
            _ = cancel.cancelled() => return,
            res = socket.recv() => res,
        };
        match reply {
            Ok(payload) => {
                let delivered = tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = inbound.send_async(Message::new(payload)) => sent,
                };
                if delivered.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = inbound.try_send(Message::from_error(e.to_string()));
                fatal(&quit, &cancel, e.into());
                return;
            }
        }
    }
}

/// The mirror of [`request_pump`] for Rep/Router sockets: each request from
/// the wire is delivered to the mailbox, and the next non-empty outbound
/// message answers it.
async fn reply_pump(
    socket: Arc<dyn Socket>,
    out: flume::Receiver<Message>,
    inbound: flume::Sender<Message>,
    quit: QuitSender,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            _ = cancel.cancelled() => return,
            res = socket.recv() => res,
        };
        let request = match request {
            Ok(payload) => Message::new(payload),
            Err(e) => {
                let _ = inbound.try_send(Message::from_error(e.to_string()));
                fatal(&quit, &cancel, e.into());
                return;
            }
        };
        let delivered = tokio::select! {
            _ = cancel.cancelled() => return,
            sent = inbound.send_async(request) => sent,
        };
        if delivered.is_err() {
            return;
        }

        let reply = loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => return,
                res = out.recv_async() => match res {
                    Ok(msg) => msg,
                    Err(_) => return,
                },
            };
            if !msg.payload.is_empty() {
                break msg;
            }
        };
        if let Err(e) = socket.send(reply.payload).await {
            fatal(&quit, &cancel, e.into());
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_plan_classes() {
        assert_eq!(pump_plan(SocketType::Pub), PumpPlan::Sender);
        assert_eq!(pump_plan(SocketType::Push), PumpPlan::Sender);
        assert_eq!(pump_plan(SocketType::Sub), PumpPlan::Receiver);
        assert_eq!(pump_plan(SocketType::Pull), PumpPlan::Receiver);
        assert_eq!(pump_plan(SocketType::XPub), PumpPlan::Duplex);
        assert_eq!(pump_plan(SocketType::Bus), PumpPlan::Duplex);
        assert_eq!(pump_plan(SocketType::Req), PumpPlan::Request);
        assert_eq!(pump_plan(SocketType::Rep), PumpPlan::Reply);
    }
}
