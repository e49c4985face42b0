//! Classification of console output lines.
//!
//! [`classify`] maps one line to a [`ConsoleEvent`]. The rules are plain
//! substring checks and are applied in this order, first match wins:
//!
//! 1. `DEL` together with `Device` or `Transport` is a removal.
//! 2. `NEW` together with `Device` or `Transport` is an addition.
//! 3. A line starting with `Status:`, `Track.Title:` or `Track.Artist:` is a
//!    player change, whatever else the line contains.
//! 4. `CHG` followed by `Player`, `Device` or `Transport` (checked in that
//!    order) is a change of that object.
//! 5. Anything else is unrecognized.
//!
//! The order matters: a device named "NEW CHG Player" still classifies by the
//! earliest matching rule. Passkey prompts are detected separately by
//! [`passkey_prompt`] and may accompany any classification.

use std::sync::LazyLock;

use regex::Regex;

/// Prefixes of player property lines printed without a change marker.
const PLAYER_FIELD_PREFIXES: [&str; 3] = ["Status:", "Track.Title:", "Track.Artist:"];

/// Markers the console puts in front of asynchronous notifications.
const NOTIFICATION_MARKERS: [&str; 3] = ["[NEW]", "[CHG]", "[DEL]"];

/// Phrase printed by the agent when pairing needs confirmation.
pub const PASSKEY_PHRASE: &str = "Confirm passkey";

static PASSKEY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Confirm passkey\s+(\d+)").expect("valid passkey regex"));

static PROMPT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]\[]+\][#>]$").expect("valid prompt regex"));

/// Category of a console output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleEvent {
    /// A device appeared.
    DeviceAdded,
    /// A device was removed.
    DeviceRemoved,
    /// A device property changed.
    DeviceChanged,
    /// A media transport appeared.
    TransportAdded,
    /// A media transport was removed.
    TransportRemoved,
    /// A media transport property changed.
    TransportChanged,
    /// A player property changed.
    PlayerChanged,
    /// The line carries nothing the bridge understands.
    Unrecognized,
}

/// Classifies a single console line.
#[must_use]
pub fn classify(line: &str) -> ConsoleEvent {
    let has_device = line.contains("Device");
    let has_transport = line.contains("Transport");

    if line.contains("DEL") {
        if has_device {
            return ConsoleEvent::DeviceRemoved;
        }
        if has_transport {
            return ConsoleEvent::TransportRemoved;
        }
    }

    if line.contains("NEW") {
        if has_device {
            return ConsoleEvent::DeviceAdded;
        }
        if has_transport {
            return ConsoleEvent::TransportAdded;
        }
    }

    let trimmed = line.trim_start();
    if PLAYER_FIELD_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return ConsoleEvent::PlayerChanged;
    }

    if line.contains("CHG") {
        if line.contains("Player") {
            return ConsoleEvent::PlayerChanged;
        }
        if has_device {
            return ConsoleEvent::DeviceChanged;
        }
        if has_transport {
            return ConsoleEvent::TransportChanged;
        }
    }

    ConsoleEvent::Unrecognized
}

/// Returns the passkey code if the line asks for pairing confirmation.
///
/// The code is kept as text to preserve leading zeros. It is empty when the
/// phrase appears without digits.
#[must_use]
pub fn passkey_prompt(line: &str) -> Option<String> {
    if !line.contains(PASSKEY_PHRASE) {
        return None;
    }
    let code = PASSKEY_CODE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |m| m.as_str().to_string());
    Some(code)
}

/// Returns true if the line starts with an asynchronous notification marker.
#[must_use]
pub fn is_notification(line: &str) -> bool {
    let trimmed = strip_prompt(line).trim_start();
    NOTIFICATION_MARKERS
        .iter()
        .any(|marker| trimmed.starts_with(marker))
}

/// Returns true if the line is a bare console prompt such as `[bluetooth]#`.
#[must_use]
pub fn is_prompt(line: &str) -> bool {
    PROMPT_LINE.is_match(line.trim())
}

/// Removes a leading console prompt from a line.
fn strip_prompt(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('[') {
        if let Some(end) = trimmed.find("]# ") {
            return &trimmed[end + 3..];
        }
    }
    trimmed
}
