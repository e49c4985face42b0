//! Turns console output lines into events.
//!
//! Every stdout line passes through [`LinePipeline::process`] on the reader
//! task, in arrival order. Reply lines are handed to a pending query; the
//! rest is classified and published.

use std::sync::{Arc, PoisonError, RwLock};

use crate::commands::ReplyCapture;
use crate::event::{Event, EventDispatcher};
use crate::protocol::{
    ConsoleCommand, ConsoleEvent, classify, extract_connection_change, extract_device_mention,
    extract_player_update, is_notification, passkey_prompt,
};
use crate::types::PlayerState;

/// Line processing shared by the reader task.
#[derive(Clone)]
pub struct LinePipeline {
    dispatcher: EventDispatcher,
    player: Arc<RwLock<PlayerState>>,
    capture: ReplyCapture,
    auto_confirm_passkey: bool,
}

impl LinePipeline {
    /// Creates a pipeline publishing on `dispatcher`.
    #[must_use]
    pub fn new(
        dispatcher: EventDispatcher,
        player: Arc<RwLock<PlayerState>>,
        capture: ReplyCapture,
        auto_confirm_passkey: bool,
    ) -> Self {
        Self {
            dispatcher,
            player,
            capture,
            auto_confirm_passkey,
        }
    }

    /// Processes one line.
    ///
    /// Returns a command to write back when the line needs an automatic
    /// answer.
    pub fn process(&self, line: &str) -> Option<ConsoleCommand> {
        tracing::trace!("console: {}", line);

        if !is_notification(line) {
            self.capture.offer(line);
        }

        match classify(line) {
            ConsoleEvent::DeviceAdded => self.device_added(line),
            ConsoleEvent::DeviceRemoved => self.device_removed(line),
            ConsoleEvent::DeviceChanged => self.device_changed(line),
            ConsoleEvent::PlayerChanged => self.player_changed(line),
            ConsoleEvent::TransportAdded
            | ConsoleEvent::TransportRemoved
            | ConsoleEvent::TransportChanged => {
                tracing::debug!("media transport update: {}", line);
            }
            ConsoleEvent::Unrecognized => {}
        }

        let code = passkey_prompt(line)?;
        tracing::info!("passkey confirmation requested: {:?}", code);
        self.dispatcher.publish(Event::PasskeyRequested { code });
        self.auto_confirm_passkey
            .then_some(ConsoleCommand::ConfirmPasskey(true))
    }

    fn device_added(&self, line: &str) {
        let Some(device) = extract_device_mention(line) else {
            tracing::debug!("new device line without address: {}", line);
            return;
        };
        self.dispatcher.publish(Event::DeviceFound {
            device,
            paired: false,
        });
        self.dispatcher.publish(Event::RegistryChanged);
    }

    fn device_removed(&self, line: &str) {
        let Some(device) = extract_device_mention(line) else {
            tracing::debug!("removed device line without address: {}", line);
            return;
        };
        self.dispatcher.publish(Event::DeviceRemoved {
            address: device.address,
        });
        self.dispatcher.publish(Event::RegistryChanged);
    }

    fn device_changed(&self, line: &str) {
        self.dispatcher.publish(Event::RegistryChanged);

        let Some((address, connected)) = extract_connection_change(line) else {
            tracing::trace!("device change without connection state");
            return;
        };
        self.dispatcher.publish(if connected {
            Event::DeviceConnected { address }
        } else {
            Event::DeviceDisconnected { address }
        });
    }

    fn player_changed(&self, line: &str) {
        let Some(update) = extract_player_update(line) else {
            tracing::debug!("player line without known field: {}", line);
            return;
        };
        self.player
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(&update);
        self.dispatcher.publish(Event::from(update));
    }
}
