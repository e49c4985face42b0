//! Console protocol handling.
//!
//! The console has no wire format. This module turns its text into
//! structured data and back:
//! - Line decoding of the raw output stream
//! - Line classification
//! - Field extraction from lines and reply blocks
//! - Command formatting

pub mod classify;
pub mod command;
pub mod line;
pub mod parser;

pub use classify::{ConsoleEvent, classify, is_notification, is_prompt, passkey_prompt};
pub use command::{ConsoleCommand, DeviceFilter, PlayerCommand};
pub use line::{LineDecoder, MAX_LINE_LEN};
pub use parser::{
    extract_connection_change, extract_device_list, extract_device_mention, extract_device_status,
    extract_player_update, extract_soft_block,
};
