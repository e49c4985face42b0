//! Capture of query reply blocks.
//!
//! The reader task is the only consumer of console output. While a query is
//! outstanding it also offers each reply line to the active [`ReplyReader`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::protocol::is_prompt;

#[derive(Debug, Default)]
struct Slot {
    sender: Option<mpsc::UnboundedSender<String>>,
    closed: bool,
}

type SharedSlot = Arc<Mutex<Slot>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hand-off point between the reader task and a pending query.
#[derive(Debug, Clone, Default)]
pub struct ReplyCapture {
    slot: SharedSlot,
}

impl ReplyCapture {
    /// Creates an idle capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a line to the pending query, if any.
    pub fn offer(&self, line: &str) {
        if let Some(tx) = lock(&self.slot).sender.as_ref() {
            let _ = tx.send(line.to_string());
        }
    }

    /// Returns true while a query is capturing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.slot).sender.is_some()
    }

    /// Ends capturing for good.
    ///
    /// A pending reader sees the end of its channel, and every later reader
    /// starts out closed.
    pub fn close(&self) {
        let mut slot = lock(&self.slot);
        slot.closed = true;
        slot.sender = None;
    }

    /// Starts capturing. Capture ends when the reader is dropped.
    #[must_use]
    pub fn begin(&self) -> ReplyReader {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = lock(&self.slot);
        if !slot.closed {
            slot.sender = Some(tx);
        }
        drop(slot);
        ReplyReader {
            slot: Arc::clone(&self.slot),
            rx,
        }
    }
}

/// Receives the lines of one reply block.
#[derive(Debug)]
pub struct ReplyReader {
    slot: SharedSlot,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ReplyReader {
    /// Collects the reply block.
    ///
    /// The block ends at a prompt line or after `quiet` without output.
    /// Waiting longer than `timeout` for the first line is a
    /// [`Error::QueryTimeout`]. A capture closed before the block ends is
    /// [`Error::BridgeClosed`]. Prompt lines are not part of the block.
    pub async fn collect(mut self, timeout: Duration, quiet: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline && !lines.is_empty() {
                break;
            }
            let remaining = deadline.saturating_duration_since(now);
            let wait = if lines.is_empty() {
                remaining
            } else {
                quiet.min(remaining)
            };

            match tokio::time::timeout(wait, self.rx.recv()).await {
                Ok(Some(line)) => {
                    if is_prompt(&line) {
                        if lines.is_empty() {
                            continue;
                        }
                        break;
                    }
                    lines.push(line);
                }
                Ok(None) => return Err(Error::BridgeClosed),
                Err(_) if lines.is_empty() => {
                    return Err(Error::QueryTimeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                Err(_) => break,
            }
        }

        tracing::trace!("reply block of {} lines", lines.len());
        Ok(lines)
    }
}

impl Drop for ReplyReader {
    fn drop(&mut self) {
        lock(&self.slot).sender = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(500);
    const QUIET: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn test_collect_until_prompt() {
        let capture = ReplyCapture::new();
        let reader = capture.begin();

        capture.offer("[bluetooth]#");
        capture.offer("Device AA:BB:CC:DD:EE:FF Phone");
        capture.offer("Device 11:22:33:44:55:66 Keyboard");
        capture.offer("[bluetooth]#");
        capture.offer("late line");

        let lines = reader.collect(TIMEOUT, QUIET).await.unwrap();
        assert_eq!(
            lines,
            [
                "Device AA:BB:CC:DD:EE:FF Phone",
                "Device 11:22:33:44:55:66 Keyboard"
            ]
        );
        assert!(!capture.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_until_quiet() {
        let capture = ReplyCapture::new();
        let reader = capture.begin();

        let producer = capture.clone();
        tokio::spawn(async move {
            producer.offer("\tName: Phone");
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.offer("\tPaired: yes");
            tokio::time::sleep(Duration::from_millis(200)).await;
            producer.offer("too late");
        });

        let lines = reader.collect(TIMEOUT, QUIET).await.unwrap();
        assert_eq!(lines, ["\tName: Phone", "\tPaired: yes"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_times_out() {
        let capture = ReplyCapture::new();
        let reader = capture.begin();

        let result = reader.collect(TIMEOUT, QUIET).await;
        assert!(matches!(result, Err(Error::QueryTimeout { timeout_ms: 500 })));
        assert!(!capture.is_active());
    }

    #[test]
    fn test_offer_without_query_is_dropped() {
        let capture = ReplyCapture::new();
        assert!(!capture.is_active());
        capture.offer("Device AA:BB:CC:DD:EE:FF Phone");

        let reader = capture.begin();
        assert!(capture.is_active());
        drop(reader);
        assert!(!capture.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_releases_pending_reader() {
        let capture = ReplyCapture::new();
        let reader = capture.begin();

        let closer = capture.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.offer("Device AA:BB:CC:DD:EE:FF Phone");
            closer.close();
        });

        let started = Instant::now();
        let result = reader.collect(TIMEOUT, QUIET).await;
        assert!(matches!(result, Err(Error::BridgeClosed)));
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test]
    async fn test_begin_after_close_is_closed() {
        let capture = ReplyCapture::new();
        capture.close();

        let reader = capture.begin();
        assert!(!capture.is_active());
        let result = reader.collect(TIMEOUT, QUIET).await;
        assert!(matches!(result, Err(Error::BridgeClosed)));
    }
}
