//! Bridge configuration.

use std::time::Duration;

/// Default bound on waiting for a query reply.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default silence that ends a reply block.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Default radio control program.
pub const DEFAULT_RADIO_PROGRAM: &str = "rfkill";

/// Default radio interface name.
pub const DEFAULT_RADIO_INTERFACE: &str = "bluetooth";

/// Default capacity of the async event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum wait for the first line of a query reply.
    pub query_timeout: Duration,
    /// Silence after which a reply block is considered complete.
    pub quiet_period: Duration,
    /// Answer passkey prompts with `yes` without asking the caller.
    pub auto_confirm_passkey: bool,
    /// Radio control program (e.g. `rfkill`).
    pub radio_program: String,
    /// Radio interface passed to block/unblock.
    pub radio_interface: String,
    /// Capacity of the async event stream.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            quiet_period: DEFAULT_QUIET_PERIOD,
            auto_confirm_passkey: false,
            radio_program: DEFAULT_RADIO_PROGRAM.to_string(),
            radio_interface: DEFAULT_RADIO_INTERFACE.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query timeout.
    #[must_use]
    pub const fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the quiet period that ends a reply block.
    #[must_use]
    pub const fn quiet_period(mut self, period: Duration) -> Self {
        self.quiet_period = period;
        self
    }

    /// Enables or disables automatic passkey confirmation.
    #[must_use]
    pub const fn auto_confirm_passkey(mut self, enabled: bool) -> Self {
        self.auto_confirm_passkey = enabled;
        self
    }

    /// Sets the radio control program.
    #[must_use]
    pub fn radio_program(mut self, program: impl Into<String>) -> Self {
        self.radio_program = program.into();
        self
    }

    /// Sets the radio interface name.
    #[must_use]
    pub fn radio_interface(mut self, interface: impl Into<String>) -> Self {
        self.radio_interface = interface.into();
        self
    }

    /// Sets the event stream capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
