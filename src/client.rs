//! Main [`BluetoothCtl`] bridge implementation.
//!
//! This module provides the high-level [`BluetoothCtl`] bridge that combines
//! transport, line processing, events, the device registry and commands
//! into a unified interface.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::commands::{CommandHandler, ReplyCapture};
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, Subscription};
use crate::pipeline::LinePipeline;
use crate::registry::DeviceRegistry;
use crate::state::{BridgeState, StateHandle};
use crate::transport::{LineFeed, ProcessConfig, ProcessTransport, Transport};
use crate::types::{DeviceIdentity, PlayerState};

/// Bridge to a running `bluetoothctl` console.
pub struct BluetoothCtl<T> {
    transport: Arc<Mutex<T>>,
    dispatcher: EventDispatcher,
    commands: CommandHandler<T>,
    registry: DeviceRegistry,
    player: Arc<RwLock<PlayerState>>,
    state: StateHandle,
    capture: ReplyCapture,
    pipeline: LinePipeline,

    // Background task
    process_task: Option<JoinHandle<()>>,
}

impl BluetoothCtl<ProcessTransport> {
    /// Creates a bridge for the system `bluetoothctl` (not yet started).
    #[must_use]
    pub fn system() -> Self {
        Self::with_config(ProcessConfig::default(), BridgeConfig::default())
    }

    /// Creates a bridge running another console program.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self::with_config(ProcessConfig::new(program), BridgeConfig::default())
    }

    /// Creates a bridge with custom process and bridge configuration.
    #[must_use]
    pub fn with_config(process: ProcessConfig, config: BridgeConfig) -> Self {
        Self::new(ProcessTransport::new(process), &config)
    }
}

impl<T: Transport + 'static> BluetoothCtl<T> {
    /// Creates a bridge over the given transport.
    #[must_use]
    pub fn new(transport: T, config: &BridgeConfig) -> Self {
        let dispatcher = EventDispatcher::new(config.event_capacity);
        let transport = Arc::new(Mutex::new(transport));
        let state = StateHandle::new();
        let capture = ReplyCapture::new();

        let commands = CommandHandler::new(
            Arc::clone(&transport),
            state.clone(),
            capture.clone(),
            config,
        );

        let registry = DeviceRegistry::new();
        registry.attach(&dispatcher);

        let player = Arc::new(RwLock::new(PlayerState::default()));
        let pipeline = LinePipeline::new(
            dispatcher.clone(),
            Arc::clone(&player),
            capture.clone(),
            config.auto_confirm_passkey,
        );

        Self {
            transport,
            dispatcher,
            commands,
            registry,
            player,
            state,
            capture,
            pipeline,
            process_task: None,
        }
    }

    /// Starts the console and the background line processing.
    ///
    /// Only an idle bridge starts; later calls are no-ops. On an
    /// unsupported platform the bridge becomes disabled and this returns
    /// `Ok`. Any other startup failure also disables the bridge and is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Startup`] if the console could not be launched.
    pub async fn start(&mut self) -> Result<()> {
        if self.state.get() != BridgeState::Idle {
            return Ok(());
        }

        let started = {
            let mut transport = self.transport.lock().await;
            transport.start().await
        };

        match started {
            Ok(feed) => {
                self.state.set(BridgeState::Running);
                self.process_task = Some(tokio::spawn(run_process_loop(
                    feed,
                    self.pipeline.clone(),
                    Arc::clone(&self.transport),
                    self.state.clone(),
                    self.capture.clone(),
                    self.dispatcher.clone(),
                )));
                tracing::info!("bridge running");
                Ok(())
            }
            Err(Error::Unsupported { platform }) => {
                tracing::warn!("console unsupported on {}, bridge disabled", platform);
                self.state.set(BridgeState::Disabled);
                Ok(())
            }
            Err(e) => {
                tracing::error!("console failed to start: {}", e);
                self.state.set(BridgeState::Disabled);
                Err(e)
            }
        }
    }

    /// Stops the console. Repeated calls are no-ops.
    ///
    /// A pending query fails with [`Error::BridgeClosed`].
    pub async fn stop(&mut self) -> Result<()> {
        if self.state.get() == BridgeState::Running {
            self.state.set(BridgeState::Closed);
        }
        self.capture.close();

        if let Some(task) = self.process_task.take() {
            task.abort();
        }

        let mut transport = self.transport.lock().await;
        transport.stop().await
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    /// Watches lifecycle transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<BridgeState> {
        self.state.watch()
    }

    /// Returns true if the bridge could not start.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.state.get() == BridgeState::Disabled
    }

    /// Returns the command handler for direct command access.
    #[must_use]
    pub const fn commands(&self) -> &CommandHandler<T> {
        &self.commands
    }

    /// Returns the device registry.
    #[must_use]
    pub const fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns the dispatcher for callback subscriptions.
    #[must_use]
    pub const fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Subscribes to the async stream of all events.
    #[must_use]
    pub fn events(&self) -> Subscription {
        self.dispatcher.subscribe_all()
    }

    /// Returns a snapshot of the remote player.
    #[must_use]
    pub fn player(&self) -> PlayerState {
        self.player
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ==================== High-Level Methods ====================

    /// Lists paired devices and publishes each as found and paired.
    ///
    /// The registry picks the devices up through its subscription.
    pub async fn sync_paired_devices(&self) -> Result<Vec<DeviceIdentity>> {
        let devices = self.commands.list_paired().await?;
        for device in &devices {
            self.dispatcher.publish(Event::DeviceFound {
                device: device.clone(),
                paired: true,
            });
        }
        self.dispatcher.publish(Event::RegistryChanged);
        Ok(devices)
    }

    /// Lists connected devices and publishes a connection event for each.
    pub async fn refresh_connected(&self) -> Result<Vec<DeviceIdentity>> {
        let devices = self.commands.list_connected().await?;
        for device in &devices {
            self.dispatcher.publish(Event::DeviceConnected {
                address: device.address,
            });
        }
        Ok(devices)
    }
}

impl<T> Drop for BluetoothCtl<T> {
    fn drop(&mut self) {
        if let Some(task) = self.process_task.take() {
            task.abort();
        }
    }
}

/// Feeds console output through the pipeline until stdout closes.
async fn run_process_loop<T: Transport>(
    mut feed: LineFeed,
    pipeline: LinePipeline,
    transport: Arc<Mutex<T>>,
    state: StateHandle,
    capture: ReplyCapture,
    dispatcher: EventDispatcher,
) {
    let mut stderr_open = true;

    loop {
        tokio::select! {
            line = feed.stdout.recv() => {
                let Some(line) = line else { break };
                if let Some(reply) = pipeline.process(&line) {
                    tracing::debug!("answering {:?}", reply.to_string());
                    let mut transport = transport.lock().await;
                    if let Err(e) = transport.send(reply.encode()).await {
                        tracing::warn!("failed to answer console: {}", e);
                    }
                }
            }
            line = feed.stderr.recv(), if stderr_open => match line {
                Some(line) => tracing::warn!("console stderr: {}", line),
                None => stderr_open = false,
            },
        }
    }

    capture.close();

    // Only an exit nobody asked for is reported.
    if state.close() {
        tracing::warn!("console exited");
        dispatcher.publish(Event::ConsoleExited);
    }
}
