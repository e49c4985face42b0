//! Command handlers for console operations.
//!
//! Commands come in two shapes:
//! - Fire-and-forget commands write a line and return once it is flushed.
//!   Their outcome arrives later as events.
//! - Queries write a line and collect the reply block. Only one query is in
//!   flight at a time so replies are never interleaved.

pub mod capture;
pub mod radio;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{
    ConsoleCommand, DeviceFilter, PlayerCommand, extract_device_list, extract_device_status,
};
use crate::state::StateHandle;
use crate::transport::Transport;
use crate::types::{Address, DeviceIdentity, DeviceStatus, RadioBlockState};

pub use capture::{ReplyCapture, ReplyReader};
pub use radio::RadioControl;

/// Command handler for console operations.
pub struct CommandHandler<T> {
    transport: Arc<Mutex<T>>,
    state: StateHandle,
    capture: ReplyCapture,
    query_lock: Mutex<()>,
    query_timeout: Duration,
    quiet_period: Duration,
    radio: RadioControl,
}

impl<T: Transport> CommandHandler<T> {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        transport: Arc<Mutex<T>>,
        state: StateHandle,
        capture: ReplyCapture,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            transport,
            state,
            capture,
            query_lock: Mutex::new(()),
            query_timeout: config.query_timeout,
            quiet_period: config.quiet_period,
            radio: RadioControl::from_config(config),
        }
    }

    /// Returns the query timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Writes a command without waiting for a reply.
    pub async fn send(&self, command: ConsoleCommand) -> Result<()> {
        self.state.ensure_running()?;
        tracing::debug!("sending {:?}", command.to_string());
        let mut transport = self.transport.lock().await;
        transport.send(command.encode()).await
    }

    /// Writes a command and collects its reply block.
    ///
    /// Concurrent queries are serialised. Unsolicited `[NEW]`, `[CHG]` and
    /// `[DEL]` lines never appear in the reply.
    pub async fn query(&self, command: ConsoleCommand) -> Result<Vec<String>> {
        self.state.ensure_running()?;
        let _guard = self.query_lock.lock().await;

        // Capture before writing so a fast reply is not missed.
        let reader = self.capture.begin();
        self.send(command).await?;

        let lines = reader
            .collect(self.query_timeout, self.quiet_period)
            .await
            .inspect_err(|e| tracing::warn!("{:?} failed: {}", command.to_string(), e))?;
        Ok(lines)
    }

    // ==================== Device Commands ====================

    /// Starts or stops discovery.
    pub async fn scan(&self, enabled: bool) -> Result<()> {
        self.send(ConsoleCommand::Scan(enabled)).await
    }

    /// Connects to a device.
    pub async fn connect(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Connect(address)).await
    }

    /// Disconnects a device.
    pub async fn disconnect(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Disconnect(address)).await
    }

    /// Pairs with a device.
    pub async fn pair(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Pair(address)).await
    }

    /// Removes a device from the controller.
    pub async fn remove(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Remove(address)).await
    }

    /// Marks a device as trusted.
    pub async fn trust(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Trust(address)).await
    }

    /// Revokes trust from a device.
    pub async fn untrust(&self, address: Address) -> Result<()> {
        self.send(ConsoleCommand::Untrust(address)).await
    }

    /// Answers a pending passkey confirmation.
    pub async fn confirm_passkey(&self, accept: bool) -> Result<()> {
        self.send(ConsoleCommand::ConfirmPasskey(accept)).await
    }

    // ==================== Listings ====================

    /// Lists devices matching a filter, in console order.
    pub async fn list_devices(&self, filter: DeviceFilter) -> Result<Vec<DeviceIdentity>> {
        let lines = self.query(ConsoleCommand::Devices(filter)).await?;
        Ok(extract_device_list(&lines.join("\n")))
    }

    /// Lists paired devices.
    pub async fn list_paired(&self) -> Result<Vec<DeviceIdentity>> {
        self.list_devices(DeviceFilter::Paired).await
    }

    /// Lists bonded devices.
    pub async fn list_bonded(&self) -> Result<Vec<DeviceIdentity>> {
        self.list_devices(DeviceFilter::Bonded).await
    }

    /// Lists trusted devices.
    pub async fn list_trusted(&self) -> Result<Vec<DeviceIdentity>> {
        self.list_devices(DeviceFilter::Trusted).await
    }

    /// Lists connected devices.
    pub async fn list_connected(&self) -> Result<Vec<DeviceIdentity>> {
        self.list_devices(DeviceFilter::Connected).await
    }

    /// Reads the status of one device.
    ///
    /// Fields missing from the reply keep their defaults. The address is
    /// taken from the request when the reply does not carry one.
    pub async fn get_device_info(&self, address: Address) -> Result<DeviceStatus> {
        let lines = self.query(ConsoleCommand::Info(address)).await?;
        let mut status = extract_device_status(&lines.join("\n"));
        status.address.get_or_insert(address);
        Ok(status)
    }

    // ==================== Player ====================

    /// Sends a media player command.
    pub async fn player(&self, command: PlayerCommand) -> Result<()> {
        self.send(ConsoleCommand::Player(command)).await
    }

    /// Starts playback.
    pub async fn play(&self) -> Result<()> {
        self.player(PlayerCommand::Play).await
    }

    /// Pauses playback.
    pub async fn pause(&self) -> Result<()> {
        self.player(PlayerCommand::Pause).await
    }

    /// Stops playback.
    pub async fn stop_playback(&self) -> Result<()> {
        self.player(PlayerCommand::Stop).await
    }

    /// Skips to the next track.
    pub async fn next_track(&self) -> Result<()> {
        self.player(PlayerCommand::Next).await
    }

    /// Returns to the previous track.
    pub async fn previous_track(&self) -> Result<()> {
        self.player(PlayerCommand::Previous).await
    }

    /// Prints the player properties.
    pub async fn show_player(&self) -> Result<()> {
        self.player(PlayerCommand::Show).await
    }

    // ==================== Radio ====================

    /// Reads the radio soft-block state.
    ///
    /// Runs the radio tool directly, so it works even when the console is
    /// not running.
    pub async fn get_soft_block_state(&self) -> Result<RadioBlockState> {
        self.radio.soft_block_state().await
    }

    /// Soft-blocks or unblocks the radio.
    pub async fn set_radio_blocked(&self, blocked: bool) -> Result<()> {
        self.radio.set_blocked(blocked).await
    }

    /// Soft-blocks the radio.
    pub async fn block_radio(&self) -> Result<()> {
        self.set_radio_blocked(true).await
    }

    /// Unblocks the radio.
    pub async fn unblock_radio(&self) -> Result<()> {
        self.set_radio_blocked(false).await
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::Error;
    use crate::state::BridgeState;
    use crate::transport::LineFeed;

    /// Transport that replies to each written line from a script.
    struct ScriptedTransport {
        capture: ReplyCapture,
        replies: fn(&str) -> Vec<&'static str>,
        written: Arc<StdMutex<Vec<String>>>,
    }

    impl Transport for ScriptedTransport {
        fn start(&mut self) -> Pin<Box<dyn Future<Output = Result<LineFeed>> + Send + '_>> {
            Box::pin(async move {
                let (_, stdout) = mpsc::channel(1);
                let (_, stderr) = mpsc::channel(1);
                Ok(LineFeed { stdout, stderr })
            })
        }

        fn stop(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move { Ok(()) })
        }

        fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                let line = String::from_utf8_lossy(&data).trim_end().to_string();
                for reply in (self.replies)(&line) {
                    self.capture.offer(reply);
                }
                self.written.lock().unwrap().push(line);
                Ok(())
            })
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn replies(line: &str) -> Vec<&'static str> {
        match line {
            "devices Paired" => vec![
                "Device AA:BB:CC:DD:EE:FF Phone",
                "Device 11:22:33:44:55:66 Keyboard",
                "[bluetooth]#",
            ],
            "info AA:BB:CC:DD:EE:FF" => vec![
                "\tName: Phone",
                "\tPaired: yes",
                "\tConnected: no",
                "[bluetooth]#",
            ],
            _ => Vec::new(),
        }
    }

    fn handler(state: BridgeState) -> (CommandHandler<ScriptedTransport>, Arc<StdMutex<Vec<String>>>) {
        let capture = ReplyCapture::new();
        let written = Arc::new(StdMutex::new(Vec::new()));
        let transport = ScriptedTransport {
            capture: capture.clone(),
            replies,
            written: Arc::clone(&written),
        };
        let handle = StateHandle::new();
        handle.set(state);
        let config = BridgeConfig::new()
            .query_timeout(Duration::from_millis(200))
            .quiet_period(Duration::from_millis(20));
        let commands = CommandHandler::new(
            Arc::new(Mutex::new(transport)),
            handle,
            capture,
            &config,
        );
        (commands, written)
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_fire_and_forget_tokens() {
        let (commands, written) = handler(BridgeState::Running);
        let address = addr("AA:BB:CC:DD:EE:FF");

        commands.scan(true).await.unwrap();
        commands.pair(address).await.unwrap();
        commands.trust(address).await.unwrap();
        commands.connect(address).await.unwrap();
        commands.pause().await.unwrap();

        assert_eq!(
            *written.lock().unwrap(),
            [
                "scan on",
                "pair AA:BB:CC:DD:EE:FF",
                "trust AA:BB:CC:DD:EE:FF",
                "connect AA:BB:CC:DD:EE:FF",
                "menu player\npause\nback",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_paired() {
        let (commands, _) = handler(BridgeState::Running);
        let devices = commands.list_paired().await.unwrap();
        assert_eq!(
            devices,
            [
                DeviceIdentity::new(addr("AA:BB:CC:DD:EE:FF"), "Phone"),
                DeviceIdentity::new(addr("11:22:33:44:55:66"), "Keyboard"),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_device_info_fills_address() {
        let (commands, _) = handler(BridgeState::Running);
        let address = addr("AA:BB:CC:DD:EE:FF");
        let status = commands.get_device_info(address).await.unwrap();

        assert_eq!(status.address, Some(address));
        assert_eq!(status.name, "Phone");
        assert!(status.paired);
        assert!(!status.connected);
        assert_eq!(status.battery(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_without_reply_times_out() {
        let (commands, _) = handler(BridgeState::Running);
        let result = commands.list_trusted().await;
        assert!(matches!(result, Err(Error::QueryTimeout { timeout_ms: 200 })));
    }

    #[tokio::test]
    async fn test_fails_fast_unless_running() {
        let (commands, written) = handler(BridgeState::Closed);
        assert!(matches!(
            commands.scan(true).await,
            Err(Error::BridgeClosed)
        ));

        let (commands, _) = handler(BridgeState::Disabled);
        assert!(matches!(
            commands.list_paired().await,
            Err(Error::Disabled)
        ));
        assert!(written.lock().unwrap().is_empty());
    }
}
