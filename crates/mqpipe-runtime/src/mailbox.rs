//! Per-channel mailboxes.
//!
//! A channel bridges a wire socket to a pair of in-process FIFO queues: an
//! outbound queue (user logic → socket) and an inbound queue (socket → user
//! logic). The [`Mailbox`] handle bundles both directions; user logic sends
//! into the outbound queue and receives from the inbound queue, while the
//! channel pumps use the complementary halves.

use mqpipe_core::{Error, Message, Result};

/// A clonable handle on a channel's message queues.
#[derive(Clone)]
pub struct Mailbox {
    out_tx: flume::Sender<Message>,
    out_rx: flume::Receiver<Message>,
    in_tx: flume::Sender<Message>,
    in_rx: flume::Receiver<Message>,
}

impl Mailbox {
    /// Create a mailbox with bounded queues: `snd` outbound slots and `rcv`
    /// inbound slots.
    pub fn bounded(snd: usize, rcv: usize) -> Self {
        let (out_tx, out_rx) = flume::bounded(snd.max(1));
        let (in_tx, in_rx) = flume::bounded(rcv.max(1));
        Self {
            out_tx,
            out_rx,
            in_tx,
            in_rx,
        }
    }

    /// Queue a message for the socket. Blocks while the outbound queue is
    /// full.
    pub async fn send(&self, msg: impl Into<Message>) -> Result<()> {
        self.out_tx
            .send_async(msg.into())
            .await
            .map_err(|_| Error::MailboxClosed)
    }

    /// Receive the next message delivered by the socket.
    pub async fn recv(&self) -> Result<Message> {
        self.in_rx
            .recv_async()
            .await
            .map_err(|_| Error::MailboxClosed)
    }

    /// Engine side: the next message user logic queued for the wire.
    pub(crate) fn outbound(&self) -> flume::Receiver<Message> {
        self.out_rx.clone()
    }

    /// Engine side: where received payloads are delivered.
    pub(crate) fn inbound(&self) -> flume::Sender<Message> {
        self.in_tx.clone()
    }
}
