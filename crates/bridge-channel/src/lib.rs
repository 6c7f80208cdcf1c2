//! # Bridge Channel - Transport Between Host and View
//!
//! The channel is the only communication path between the two processes.
//! It carries plain JSON values, delivers them in send order per direction,
//! and never loses or duplicates a message. Everything above it (envelopes,
//! correlation, routing) lives in other crates.
//!
//! ```text
//! ┌──────────────┐   post()        ┌──────────────┐
//! │     View     │ ──────────────▶ │     Host     │
//! │              │ ◀────────────── │              │
//! └──────────────┘        post()   └──────────────┘
//! ```
//!
//! Two transports are provided:
//!
//! - [`memory::duplex`]: in-process pair of endpoints backed by `tokio::sync::mpsc`
//! - [`lines`]: newline-delimited JSON over any async byte stream (stdio, pipes)

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lines;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use lines::{stdio, LineReceiver, LineSender};
pub use memory::{duplex, Endpoint, MemoryReceiver, MemorySender};

/// Messages buffered per direction before `post` waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Errors from sending on the channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The other side has gone away.
    #[error("channel closed")]
    Closed,

    /// The payload could not be encoded for the transport.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The underlying stream failed.
    #[error("i/o failed: {0}")]
    Io(String),
}

/// Sending half of a channel endpoint.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Transmit one payload. Delivery is the transport's job; callers do not
    /// wait for the other side to act on it.
    async fn post(&self, payload: Value) -> Result<(), ChannelError>;

    /// Total payloads posted through this sender.
    fn messages_posted(&self) -> u64;
}

/// Receiving half of a channel endpoint.
#[async_trait]
pub trait ChannelReceiver: Send {
    /// Next payload, or `None` once the channel is closed.
    async fn recv(&mut self) -> Option<Value>;
}

/// Shared handle to a sender, as held by brokers and dispatchers.
pub type SharedSender = Arc<dyn ChannelSender>;
