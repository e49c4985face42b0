//! Console command definitions.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::Address;

/// Device listing filters accepted by `devices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFilter {
    /// Paired devices.
    Paired,
    /// Bonded devices.
    Bonded,
    /// Trusted devices.
    Trusted,
    /// Connected devices.
    Connected,
}

impl DeviceFilter {
    /// Returns the console keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paired => "Paired",
            Self::Bonded => "Bonded",
            Self::Trusted => "Trusted",
            Self::Connected => "Connected",
        }
    }
}

/// Player transport controls available in the `player` submenu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCommand {
    /// Start playback.
    Play,
    /// Pause playback.
    Pause,
    /// Stop playback.
    Stop,
    /// Next track.
    Next,
    /// Previous track.
    Previous,
    /// Print the current player properties.
    Show,
}

impl PlayerCommand {
    /// Returns the console keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Show => "show",
        }
    }
}

/// A command understood by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start or stop discovery.
    Scan(bool),
    /// Connect to a device.
    Connect(Address),
    /// Disconnect from a device.
    Disconnect(Address),
    /// Pair with a device.
    Pair(Address),
    /// Remove a device.
    Remove(Address),
    /// Trust a device.
    Trust(Address),
    /// Untrust a device.
    Untrust(Address),
    /// List devices matching a filter.
    Devices(DeviceFilter),
    /// Print device information.
    Info(Address),
    /// Run a player control inside the player submenu.
    Player(PlayerCommand),
    /// Answer a passkey confirmation prompt.
    ConfirmPasskey(bool),
}

impl ConsoleCommand {
    /// Encodes the command as newline-terminated input.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let text = self.to_string();
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        buf.put_slice(text.as_bytes());
        buf.put_u8(b'\n');
        buf.freeze()
    }
}

impl fmt::Display for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(on) => write!(f, "scan {}", if *on { "on" } else { "off" }),
            Self::Connect(address) => write!(f, "connect {address}"),
            Self::Disconnect(address) => write!(f, "disconnect {address}"),
            Self::Pair(address) => write!(f, "pair {address}"),
            Self::Remove(address) => write!(f, "remove {address}"),
            Self::Trust(address) => write!(f, "trust {address}"),
            Self::Untrust(address) => write!(f, "untrust {address}"),
            Self::Devices(filter) => write!(f, "devices {}", filter.as_str()),
            Self::Info(address) => write!(f, "info {address}"),
            // The submenu is left again so later commands run at top level.
            Self::Player(command) => write!(f, "menu player\n{}\nback", command.as_str()),
            Self::ConfirmPasskey(accept) => f.write_str(if *accept { "yes" } else { "no" }),
        }
    }
}
