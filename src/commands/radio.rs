//! Radio soft-block control through an external tool.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::protocol::extract_soft_block;
use crate::types::RadioBlockState;

/// Runs the radio control program (`rfkill` by default).
#[derive(Debug, Clone)]
pub struct RadioControl {
    program: String,
    interface: String,
    timeout: Duration,
}

impl RadioControl {
    /// Creates a controller.
    #[must_use]
    pub fn new(program: impl Into<String>, interface: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            interface: interface.into(),
            timeout,
        }
    }

    /// Creates a controller from the bridge configuration.
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.radio_program.clone(),
            config.radio_interface.clone(),
            config.query_timeout,
        )
    }

    /// Reads the soft-block state from `<program> list`.
    pub async fn soft_block_state(&self) -> Result<RadioBlockState> {
        let output = self.run(&["list"]).await?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(RadioBlockState {
            soft_blocked: extract_soft_block(&listing),
        })
    }

    /// Soft-blocks or unblocks the configured interface.
    pub async fn set_blocked(&self, blocked: bool) -> Result<()> {
        let verb = if blocked { "block" } else { "unblock" };
        self.run(&[verb, &self.interface]).await?;
        tracing::info!("radio {} {}", verb, self.interface);
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!("running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::QueryTimeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| Error::Radio {
                message: format!("{}: {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Radio {
                message: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }
        Ok(output)
    }
}
