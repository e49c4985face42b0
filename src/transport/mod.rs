//! Transport layer for console communication.
//!
//! This module provides the abstraction over the console's input and output
//! streams. The only implementation runs the console as a subprocess.

pub mod process;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Output feeds of a started console.
///
/// Each feed yields lines in order and closes when its stream ends.
#[derive(Debug)]
pub struct LineFeed {
    /// Lines from standard output.
    pub stdout: mpsc::Receiver<String>,
    /// Lines from standard error.
    pub stderr: mpsc::Receiver<String>,
}

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Starts the console and returns its output feeds.
    fn start(&mut self) -> Pin<Box<dyn Future<Output = Result<LineFeed>> + Send + '_>>;

    /// Stops the console. Repeated calls are no-ops.
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Writes raw input and flushes it.
    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns true while input can be written.
    fn is_open(&self) -> bool;
}

pub use process::{ProcessConfig, ProcessTransport};
