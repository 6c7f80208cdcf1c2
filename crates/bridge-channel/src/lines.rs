//! # Newline-Delimited JSON Transport
//!
//! One JSON value per line over any async byte stream. This is how a host
//! process talks to a view living in another process (over stdio or a pipe).
//!
//! Lines that fail to decode are protocol anomalies: they are logged and
//! skipped, never fatal. A read error ends the stream.

use crate::{ChannelError, ChannelReceiver, ChannelSender};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Sender writing one JSON value per line.
pub struct LineSender<W> {
    writer: Mutex<W>,
    posted: AtomicU64,
}

impl<W> LineSender<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            posted: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl<W> ChannelSender for LineSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn post(&self, payload: Value) -> Result<(), ChannelError> {
        let mut line =
            serde_json::to_vec(&payload).map_err(|e| ChannelError::Encode(e.to_string()))?;
        line.push(b'\n');

        // Hold the lock for the whole line so concurrent posts never interleave.
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))?;

        self.posted.fetch_add(1, Ordering::Relaxed);
        debug!(bytes = line.len(), "Line posted");
        Ok(())
    }

    fn messages_posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }
}

/// Receiver reading one JSON value per line.
pub struct LineReceiver<R> {
    reader: R,
    buf: Vec<u8>,
    skipped: u64,
}

impl<R: AsyncBufRead + Unpin> LineReceiver<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            skipped: 0,
        }
    }

    /// Lines dropped because they did not decode.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl<R> ChannelReceiver for LineReceiver<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self) -> Option<Value> {
        loop {
            self.buf.clear();
            // Raw bytes: a line that is not UTF-8 is an undecodable line, not a read error
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    debug!("Line stream ended");
                    return None;
                }
                Ok(_) => {
                    let line = self.buf.trim_ascii();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice(line) {
                        Ok(payload) => return Some(payload),
                        Err(e) => {
                            self.skipped += 1;
                            warn!(error = %e, skipped = self.skipped, "Dropping undecodable line");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Line stream failed");
                    return None;
                }
            }
        }
    }
}

/// Transport over this process's stdin and stdout.
pub fn stdio() -> (
    LineSender<tokio::io::Stdout>,
    LineReceiver<BufReader<tokio::io::Stdin>>,
) {
    (
        LineSender::new(tokio::io::stdout()),
        LineReceiver::new(BufReader::new(tokio::io::stdin())),
    )
}
