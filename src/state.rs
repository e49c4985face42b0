//! Bridge lifecycle state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Lifecycle of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Created, not started.
    Idle,
    /// Console process is running.
    Running,
    /// Startup failed or the platform is unsupported.
    Disabled,
    /// Console exited or the bridge was stopped.
    Closed,
}

/// Shared, observable bridge state.
#[derive(Debug, Clone)]
pub struct StateHandle {
    sender: Arc<watch::Sender<BridgeState>>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    /// Creates a handle in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(BridgeState::Idle);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> BridgeState {
        *self.sender.borrow()
    }

    /// Sets the state.
    pub fn set(&self, state: BridgeState) {
        self.sender.send_replace(state);
    }

    /// Moves `Running` to `Closed`.
    ///
    /// Returns true if this call performed the transition.
    pub fn close(&self) -> bool {
        self.sender.send_if_modified(|state| {
            if *state == BridgeState::Running {
                *state = BridgeState::Closed;
                true
            } else {
                false
            }
        })
    }

    /// Fails fast unless the console is running.
    pub fn ensure_running(&self) -> Result<()> {
        match self.get() {
            BridgeState::Running => Ok(()),
            BridgeState::Idle | BridgeState::Closed => Err(Error::BridgeClosed),
            BridgeState::Disabled => Err(Error::Disabled),
        }
    }

    /// Watches state transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<BridgeState> {
        self.sender.subscribe()
    }
}
