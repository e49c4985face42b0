//! Field extraction from console text.
//!
//! Every function here is pure and tolerant: a missing field falls back to
//! its default. Only [`extract_connection_change`] can fail, because a change
//! line without both an address and a connection flag carries no event.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{
    Address, BATTERY_UNKNOWN, DeviceIdentity, DeviceStatus, PlayerStatus, PlayerUpdate,
};

/// Builds a regex from a literal pattern.
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid extractor regex")
}

static ADDRESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b((?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2})\b(?:\s+(.*))?"));
static DEVICE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"Device\s+((?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2})\b"));
static NAME: LazyLock<Regex> = LazyLock::new(|| pattern(r"Name:[ \t]*(.+)"));
static PAIRED: LazyLock<Regex> = LazyLock::new(|| pattern(r"Paired:\s*(yes|no)"));
static TRUSTED: LazyLock<Regex> = LazyLock::new(|| pattern(r"Trusted:\s*(yes|no)"));
static BONDED: LazyLock<Regex> = LazyLock::new(|| pattern(r"Bonded:\s*(yes|no)"));
static CONNECTED: LazyLock<Regex> = LazyLock::new(|| pattern(r"Connected:\s*(yes|no)"));
static BATTERY: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"Battery Percentage:\s*0x([0-9A-Fa-f]{2})\s*\((\d+)\)")
});
static SOFT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\d+:\s+hci\d+:\s+Bluetooth\s+Soft blocked:\s*(yes|no)")
});
static TRACK_TITLE: LazyLock<Regex> = LazyLock::new(|| pattern(r"Track\.Title:\s*(.+)"));
static TRACK_ARTIST: LazyLock<Regex> = LazyLock::new(|| pattern(r"Track\.Artist:\s*(.+)"));

/// Returns the first capture group of `re` in `text`.
fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns true if `re` captures `yes` in `text`.
fn flag(re: &Regex, text: &str) -> bool {
    capture(re, text) == Some("yes")
}

/// Finds an address token and takes the text after it as the name.
#[must_use]
pub fn extract_device_mention(line: &str) -> Option<DeviceIdentity> {
    let caps = ADDRESS_TOKEN.captures(line)?;
    let address: Address = caps.get(1)?.as_str().parse().ok()?;
    let name = caps.get(2).map_or("", |m| m.as_str().trim());
    Some(DeviceIdentity::new(address, name))
}

/// Parses an `info` reply block.
///
/// Booleans default to false, the battery to [`BATTERY_UNKNOWN`] and the
/// name to empty.
#[must_use]
pub fn extract_device_status(block: &str) -> DeviceStatus {
    let address = capture(&DEVICE_ADDRESS, block).and_then(|s| s.parse().ok());
    let name = capture(&NAME, block)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    DeviceStatus {
        address,
        name,
        paired: flag(&PAIRED, block),
        trusted: flag(&TRUSTED, block),
        bonded: flag(&BONDED, block),
        connected: flag(&CONNECTED, block),
        battery_percent: extract_battery(block),
    }
}

/// Parses `Battery Percentage: 0x64 (100)`.
fn extract_battery(block: &str) -> i8 {
    let Some(caps) = BATTERY.captures(block) else {
        return BATTERY_UNKNOWN;
    };
    let decimal = caps.get(2).and_then(|m| m.as_str().parse::<u8>().ok());
    let raw = caps.get(1).and_then(|m| {
        let mut byte = [0u8; 1];
        hex::decode_to_slice(m.as_str(), &mut byte).ok().map(|()| byte[0])
    });

    match decimal.or(raw) {
        Some(percent) if percent <= 100 => i8::try_from(percent).unwrap_or(BATTERY_UNKNOWN),
        _ => BATTERY_UNKNOWN,
    }
}

/// Parses a `devices` listing, one identity per device line.
///
/// Order is preserved and duplicates are kept.
#[must_use]
pub fn extract_device_list(block: &str) -> Vec<DeviceIdentity> {
    block
        .lines()
        .filter(|line| line.contains("Device"))
        .filter_map(extract_device_mention)
        .collect()
}

/// Parses a `Connected: yes|no` change for a device.
///
/// Returns `None` unless both the address and the flag are present.
#[must_use]
pub fn extract_connection_change(block: &str) -> Option<(Address, bool)> {
    let address = capture(&DEVICE_ADDRESS, block)?.parse().ok()?;
    let connected = capture(&CONNECTED, block)? == "yes";
    Some((address, connected))
}

/// Returns true only if a Bluetooth radio reports `Soft blocked: yes`.
#[must_use]
pub fn extract_soft_block(block: &str) -> bool {
    SOFT_BLOCK
        .captures_iter(block)
        .any(|caps| caps.get(1).is_some_and(|m| m.as_str() == "yes"))
}

/// Parses one player change line.
///
/// A status keyword anywhere in the line wins, checked as `paused`, then
/// `playing`, then `stopped`. Otherwise a title label, then an artist label.
#[must_use]
pub fn extract_player_update(line: &str) -> Option<PlayerUpdate> {
    if let Some(status) = ["paused", "playing", "stopped"]
        .into_iter()
        .find(|keyword| line.contains(keyword))
        .and_then(PlayerStatus::from_keyword)
    {
        return Some(PlayerUpdate::Status(status));
    }
    if let Some(title) = capture(&TRACK_TITLE, line) {
        return Some(PlayerUpdate::Title(title.trim().to_string()));
    }
    capture(&TRACK_ARTIST, line).map(|artist| PlayerUpdate::Artist(artist.trim().to_string()))
}
