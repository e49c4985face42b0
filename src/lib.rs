//! # bluetoothctl
//!
//! A Rust bridge to the interactive `bluetoothctl` console.
//!
//! This library runs `bluetoothctl` as a child process and turns its text
//! output into typed events and query results.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Callback and stream subscriptions for device, player and pairing events
//! - Typed device addresses, status and player state
//! - A device registry kept in sync with discovery
//! - Radio soft-block control through `rfkill`
//!
//! ## Quick Start
//!
//! ```no_run
//! use bluetoothctl::{BluetoothCtl, Event, EventKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bluetoothctl::Error> {
//!     let mut bridge = BluetoothCtl::system();
//!     bridge.start().await?;
//!
//!     bridge.dispatcher().subscribe(EventKind::DeviceFound, |event| {
//!         if let Event::DeviceFound { device, .. } = event {
//!             println!("found {} {}", device.address, device.name);
//!         }
//!         Ok(())
//!     });
//!
//!     for device in bridge.sync_paired_devices().await? {
//!         let status = bridge.commands().get_device_info(device.address).await?;
//!         println!("{}: connected={}", status.name, status.connected);
//!     }
//!
//!     bridge.commands().scan(true).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     bridge.commands().scan(false).await?;
//!
//!     bridge.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Line decoding, classification, field extraction, commands
//! - [`types`] - Data structures (addresses, device status, player state)
//! - [`transport`] - The console subprocess
//! - [`event`] - Event dispatcher with callback and async subscriptions
//! - [`registry`] - Known devices
//! - [`commands`] - Command handler for console operations
//! - [`client`] - High-level [`BluetoothCtl`] bridge

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::BluetoothCtl;
pub use commands::{CommandHandler, RadioControl};
pub use config::BridgeConfig;
pub use error::{AddressError, Error, Result};
pub use event::{
    Event, EventDispatcher, EventKind, HandlerError, HandlerResult, Subscription, SubscriptionId,
};
pub use protocol::{ConsoleCommand, ConsoleEvent, DeviceFilter, PlayerCommand};
pub use registry::DeviceRegistry;
pub use state::BridgeState;
pub use transport::{ProcessConfig, ProcessTransport, Transport};
pub use types::{
    Address, DeviceIdentity, DeviceStatus, PlayerState, PlayerStatus, PlayerUpdate,
    RadioBlockState,
};
