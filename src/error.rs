//! Error types for the bluetoothctl bridge.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The console process could not be started.
    #[error("failed to start console: {reason}")]
    Startup { reason: String },

    /// The console requires a POSIX-like host.
    #[error("console is not supported on {platform}")]
    Unsupported { platform: &'static str },

    /// A query received no reply in time.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// The console process has exited or was stopped.
    #[error("bridge closed")]
    BridgeClosed,

    /// The bridge never started because the platform is unsupported
    /// or startup failed.
    #[error("bridge disabled")]
    Disabled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid device address.
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    /// The radio control tool failed.
    #[error("radio control failed: {message}")]
    Radio { message: String },
}

/// Device address parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// Wrong number of colon-separated groups.
    #[error("expected 6 groups, got {0}")]
    GroupCount(usize),

    /// A group is not exactly two hex digits.
    #[error("group {index} is not a hex octet: {group:?}")]
    InvalidOctet { index: usize, group: String },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
