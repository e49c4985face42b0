//! Subprocess transport implementation.
//!
//! This module runs the console as a child process with all three standard
//! streams piped. Output is read by two independent tasks so a full stderr
//! pipe never stalls stdout.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::LineDecoder;
use crate::transport::{LineFeed, Transport};

/// Default console program.
pub const DEFAULT_PROGRAM: &str = "bluetoothctl";

/// Capacity of each output feed.
const FEED_CAPACITY: usize = 256;

/// Configuration for the console subprocess.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Program to run, resolved through `PATH`.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ProcessConfig {
    /// Creates a configuration for the given program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Console running as a subprocess.
pub struct ProcessTransport {
    config: ProcessConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    read_tasks: Vec<JoinHandle<()>>,
}

impl ProcessTransport {
    /// Creates a new process transport with the given configuration.
    #[must_use]
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            child: None,
            stdin: None,
            read_tasks: Vec::new(),
        }
    }

    /// Creates a transport for the given program with default settings.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self::new(ProcessConfig::new(program))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Runs the read loop for one output stream.
    ///
    /// Lines are forwarded in order until the stream ends or the receiver
    /// is dropped. A trailing partial line is flushed at end of stream.
    pub async fn run_read_loop<R>(
        mut reader: R,
        stream: &'static str,
        line_tx: mpsc::Sender<String>,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut decoder = LineDecoder::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("console {} closed", stream);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("console {} read error: {}", stream, e);
                    break;
                }
            };

            tracing::trace!("received {} bytes on {}", n, stream);
            decoder.feed(&buf[..n]);

            while let Some(line) = decoder.decode() {
                if line_tx.send(line).await.is_err() {
                    tracing::debug!("{} receiver dropped", stream);
                    return;
                }
            }
            if let Some(prompt) = decoder.take_prompt() {
                if line_tx.send(prompt).await.is_err() {
                    return;
                }
            }
        }

        if let Some(line) = decoder.finish() {
            let _ = line_tx.send(line).await;
        }
    }

    fn spawn_reader<R>(&mut self, reader: R, stream: &'static str) -> mpsc::Receiver<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::channel(FEED_CAPACITY);
        self.read_tasks.push(tokio::spawn(Self::run_read_loop(reader, stream, line_tx)));
        line_rx
    }
}

impl Transport for ProcessTransport {
    fn start(&mut self) -> Pin<Box<dyn Future<Output = Result<LineFeed>> + Send + '_>> {
        Box::pin(async move {
            if !cfg!(unix) {
                return Err(Error::Unsupported {
                    platform: std::env::consts::OS,
                });
            }
            if self.child.is_some() {
                return Err(Error::Startup {
                    reason: "console already started".into(),
                });
            }

            tracing::info!("starting console: {} {:?}", self.config.program, self.config.args);

            let mut child = Command::new(&self.config.program)
                .args(&self.config.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| Error::Startup {
                    reason: if e.kind() == io::ErrorKind::NotFound {
                        format!("{} not found", self.config.program)
                    } else {
                        format!("{}: {e}", self.config.program)
                    },
                })?;

            let (Some(stdin), Some(stdout), Some(stderr)) =
                (child.stdin.take(), child.stdout.take(), child.stderr.take())
            else {
                let _ = child.start_kill();
                return Err(Error::Startup {
                    reason: "console streams not captured".into(),
                });
            };

            let stdout = self.spawn_reader(stdout, "stdout");
            let stderr = self.spawn_reader(stderr, "stderr");
            self.stdin = Some(stdin);
            self.child = Some(child);

            tracing::info!("console started");
            Ok(LineFeed { stdout, stderr })
        })
    }

    fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            // The console exits on its own once input reaches EOF.
            self.stdin = None;

            if let Some(mut child) = self.child.take() {
                tracing::info!("stopping console");
                match child.try_wait() {
                    Ok(Some(status)) => tracing::debug!("console already exited: {}", status),
                    _ => {
                        if let Err(e) = child.start_kill() {
                            tracing::warn!("failed to kill console: {}", e);
                        }
                        let status = child.wait().await?;
                        tracing::debug!("console exited: {}", status);
                    }
                }
            }
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let stdin = self.stdin.as_mut().ok_or(Error::BridgeClosed)?;

            tracing::trace!("writing {} bytes to console", data.len());
            let written = async {
                stdin.write_all(&data).await?;
                stdin.flush().await
            }
            .await;

            if let Err(e) = written {
                tracing::warn!("console input closed: {}", e);
                self.stdin = None;
                return Err(if e.kind() == io::ErrorKind::BrokenPipe {
                    Error::BridgeClosed
                } else {
                    Error::Io(e)
                });
            }
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.stdin.is_some()
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        for task in self.read_tasks.drain(..) {
            task.abort();
        }
    }
}
