//! The ordered message link between producer and worker.
//!
//! Each direction is its own FIFO queue, so messages arrive in send order,
//! exactly once. The two directions use different queue types because the
//! two ends consume differently:
//!
//! - **producer → worker**: `tokio` mpsc. The worker awaits the next message
//!   inside its event loop, which is what lets a new request land while a
//!   search is parked at a yield point.
//! - **worker → producer**: `crossbeam` channel. The producer never waits; it
//!   drains whatever arrived once per frame.

use crate::{ChannelError, Message, Result};
use crossbeam_channel::TryRecvError;
use tokio::sync::mpsc;

/// Create a connected producer/worker link pair.
pub fn link() -> (ProducerLink, WorkerLink) {
    let (to_worker, from_producer) = mpsc::unbounded_channel();
    let (to_producer, from_worker) = crossbeam_channel::unbounded();

    (
        ProducerLink {
            to_worker,
            from_worker,
        },
        WorkerLink {
            inbox: Inbox { rx: from_producer },
            outbox: Outbox { tx: to_producer },
        },
    )
}

/// Producer end of the link.
#[derive(Debug)]
pub struct ProducerLink {
    to_worker: mpsc::UnboundedSender<Message>,
    from_worker: crossbeam_channel::Receiver<Message>,
}

impl ProducerLink {
    /// Send a message to the worker (non-blocking).
    pub fn send(&self, message: Message) -> Result<()> {
        self.to_worker
            .send(message)
            .map_err(|_| ChannelError::Disconnected)
    }

    /// Take the next message from the worker, if one is waiting.
    ///
    /// Returns `Ok(None)` when nothing is queued and
    /// `Err(ChannelError::Disconnected)` once the worker is gone and the queue
    /// is drained.
    pub fn try_recv(&self) -> Result<Option<Message>> {
        match self.from_worker.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    /// Whether the worker end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.to_worker.is_closed()
    }
}

/// Worker end of the link.
#[derive(Debug)]
pub struct WorkerLink {
    inbox: Inbox,
    outbox: Outbox,
}

impl WorkerLink {
    /// Split into the receiving and sending halves.
    pub fn split(self) -> (Inbox, Outbox) {
        (self.inbox, self.outbox)
    }
}

/// Incoming half of the worker link.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Inbox {
    /// Wait for the next message. `None` once the producer is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

/// Outgoing half of the worker link.
///
/// Cheap to clone; every in-flight search holds its own copy.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: crossbeam_channel::Sender<Message>,
}

impl Outbox {
    /// Send a message to the producer (non-blocking).
    pub fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| ChannelError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_core::{RequestRecord, ResponseRecord};

    #[tokio::test]
    async fn messages_arrive_in_send_order() {
        let (producer, worker) = link();
        let (mut inbox, outbox) = worker.split();

        for i in 0..5u8 {
            producer
                .send(Message::Request(RequestRecord::new([i; 56])))
                .unwrap();
        }
        for i in 0..5u8 {
            assert_eq!(
                inbox.recv().await,
                Some(Message::Request(RequestRecord::new([i; 56])))
            );
        }

        outbox
            .send(Message::Response(ResponseRecord::new([1; 64])))
            .unwrap();
        outbox
            .send(Message::Response(ResponseRecord::new([2; 64])))
            .unwrap();
        assert_eq!(
            producer.try_recv().unwrap(),
            Some(Message::Response(ResponseRecord::new([1; 64])))
        );
        assert_eq!(
            producer.try_recv().unwrap(),
            Some(Message::Response(ResponseRecord::new([2; 64])))
        );
        assert_eq!(producer.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn dropping_producer_ends_inbox() {
        let (producer, worker) = link();
        let (mut inbox, _outbox) = worker.split();
        producer.send(Message::Init(Vec::new())).unwrap();
        drop(producer);

        assert_eq!(inbox.recv().await, Some(Message::Init(Vec::new())));
        assert_eq!(inbox.recv().await, None);
    }

    #[test]
    fn dropping_worker_disconnects_producer() {
        let (producer, worker) = link();
        drop(worker);

        assert!(producer.is_closed());
        assert_eq!(
            producer.send(Message::Init(Vec::new())),
            Err(ChannelError::Disconnected)
        );
        assert_eq!(producer.try_recv(), Err(ChannelError::Disconnected));
    }
}
