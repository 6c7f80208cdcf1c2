//! # In-Memory Channel
//!
//! A pair of endpoints wired back to back with `tokio::sync::mpsc`. Used when
//! host and view run in one process, and throughout the tests.

use crate::{ChannelError, ChannelReceiver, ChannelSender, DEFAULT_CHANNEL_CAPACITY};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sending half of an in-memory endpoint.
#[derive(Clone)]
pub struct MemorySender {
    tx: mpsc::Sender<Value>,
    posted: Arc<AtomicU64>,
}

#[async_trait]
impl ChannelSender for MemorySender {
    async fn post(&self, payload: Value) -> Result<(), ChannelError> {
        // Always increment counter (post was attempted)
        self.posted.fetch_add(1, Ordering::Relaxed);

        match self.tx.send(payload).await {
            Ok(()) => {
                debug!(queued = self.tx.max_capacity() - self.tx.capacity(), "Message posted");
                Ok(())
            }
            Err(_) => {
                warn!("Message dropped (receiver closed)");
                Err(ChannelError::Closed)
            }
        }
    }

    fn messages_posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }
}

/// Receiving half of an in-memory endpoint.
pub struct MemoryReceiver {
    rx: mpsc::Receiver<Value>,
}

impl MemoryReceiver {
    /// Receive without waiting.
    ///
    /// - `Ok(Some(payload))` - a payload was queued
    /// - `Ok(None)` - nothing queued yet
    /// - `Err(ChannelError::Closed)` - every sender is gone
    pub fn try_recv(&mut self) -> Result<Option<Value>, ChannelError> {
        match self.rx.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }
}

#[async_trait]
impl ChannelReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

/// One side of a duplex channel: what this side sends, and what it receives.
pub struct Endpoint {
    pub sender: MemorySender,
    pub receiver: MemoryReceiver,
}

impl Endpoint {
    /// Split into sender and receiver.
    pub fn split(self) -> (MemorySender, MemoryReceiver) {
        (self.sender, self.receiver)
    }
}

/// Create two connected endpoints. What one side posts, the other receives.
pub fn duplex(capacity: usize) -> (Endpoint, Endpoint) {
    let capacity = if capacity == 0 {
        DEFAULT_CHANNEL_CAPACITY
    } else {
        capacity
    };

    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);

    let a = Endpoint {
        sender: MemorySender {
            tx: a_tx,
            posted: Arc::new(AtomicU64::new(0)),
        },
        receiver: MemoryReceiver { rx: a_rx },
    };
    let b = Endpoint {
        sender: MemorySender {
            tx: b_tx,
            posted: Arc::new(AtomicU64::new(0)),
        },
        receiver: MemoryReceiver { rx: b_rx },
    };

    (a, b)
}
