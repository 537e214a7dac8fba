//! Bounded channel with sentinel packets and explicit close.
//!
//! Wraps a crossbeam bounded channel. `close()` drops a shared "closer" sender, which makes the
//! paired receiver ready immediately. Every blocking `put`/`get` selects on it, so closing wakes
//! them all without a polling loop.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ChannelClosed, PipelineError};
use crate::types::Packet;

struct CloseState {
    closed: AtomicBool,
    closer: Mutex<Option<Sender<()>>>,
}

/// Fixed-capacity FIFO of [`Packet`]s, shared by cloning.
pub struct BoundedChannel<T> {
    tx: Sender<Packet<T>>,
    rx: Receiver<Packet<T>>,
    closed_rx: Receiver<()>,
    state: Arc<CloseState>,
    capacity: usize,
}

impl<T> Clone for BoundedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            closed_rx: self.closed_rx.clone(),
            state: Arc::clone(&self.state),
            capacity: self.capacity,
        }
    }
}

impl<T> BoundedChannel<T> {
    /// Create a channel holding at most `capacity` packets. Sentinels count against capacity.
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        let (tx, rx) = bounded(capacity);
        let (closer, closed_rx) = bounded::<()>(0);
        Ok(Self {
            tx,
            rx,
            closed_rx,
            state: Arc::new(CloseState {
                closed: AtomicBool::new(false),
                closer: Mutex::new(Some(closer)),
            }),
            capacity,
        })
    }

    /// Block until there is room, then enqueue `item`. Fails once the channel is closed.
    pub fn put(&self, item: T) -> Result<(), ChannelClosed> {
        self.put_packet(Packet::Item(item))
    }

    pub fn put_end(&self) -> Result<(), ChannelClosed> {
        self.put_packet(Packet::End)
    }

    pub fn put_timeout(&self) -> Result<(), ChannelClosed> {
        self.put_packet(Packet::Timeout)
    }

    fn put_packet(&self, packet: Packet<T>) -> Result<(), ChannelClosed> {
        if self.is_closed() {
            return Err(ChannelClosed);
        }
        select! {
            send(self.tx, packet) -> res => res.map_err(|_| ChannelClosed),
            recv(self.closed_rx) -> _ => Err(ChannelClosed),
        }
    }

    /// Wait up to `timeout` for the next packet. Returns [`Packet::Timeout`] when nothing
    /// arrived in time or the channel is closed; never errors.
    pub fn get(&self, timeout: Duration) -> Packet<T> {
        self.recv_packet(timeout).unwrap_or(Packet::Timeout)
    }

    /// Like [`get`](Self::get), but tells a dequeued sentinel apart from the wait itself
    /// expiring: `None` means nothing was dequeued (timeout or closed).
    pub(crate) fn recv_packet(&self, timeout: Duration) -> Option<Packet<T>> {
        if self.is_closed() {
            return None;
        }
        select! {
            recv(self.rx) -> packet => packet.ok(),
            recv(self.closed_rx) -> _ => None,
            default(timeout) => None,
        }
    }

    /// Next packet if one is queued right now.
    pub fn try_get(&self) -> Option<Packet<T>> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Close the channel: wake blocked callers and drop whatever is still queued. Idempotent.
    pub fn close(&self) {
        if self.state.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut closer) = self.state.closer.lock() {
            closer.take();
        }
        // Release buffered payloads; a writer racing this sees `closed` on its next put.
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Packets currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
