//! Line decoding for the console output stream.
//!
//! The console writes loosely formatted text meant for a terminal:
//! ```text
//! \x01\x1b[0;94m\x02[bluetooth]\x01\x1b[0m\x02# \r\x1b[K[NEW] Device AA:BB:CC:DD:EE:FF Phone\n
//! ```
//! The decoder buffers raw bytes, splits them on `\n`, and returns the
//! printable part of each line with colour sequences, readline markers and
//! carriage-return redraws removed.

use bytes::{Buf, BytesMut};

/// Maximum number of bytes buffered without a line terminator.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Trailing text of a partial line that waits for user input.
const INPUT_PROMPT_SUFFIXES: [&str; 2] = ["]# ", "(yes/no): "];

/// Line decoder that handles partial data.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete line, if any.
    ///
    /// A partial line longer than [`MAX_LINE_LEN`] is returned as-is.
    pub fn decode(&mut self) -> Option<String> {
        if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw = self.buffer.split_to(pos);
            self.buffer.advance(1);
            return Some(sanitize(&raw));
        }

        if self.buffer.len() > MAX_LINE_LEN {
            let raw = self.buffer.split_to(MAX_LINE_LEN);
            return Some(sanitize(&raw));
        }

        None
    }

    /// Returns a buffered partial line that is waiting for input.
    ///
    /// The console prints prompts such as `[bluetooth]# ` or
    /// `Confirm passkey 123456 (yes/no): ` without a newline.
    pub fn take_prompt(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let pending = sanitize(&self.buffer);
        let raw_tail = String::from_utf8_lossy(&self.buffer).into_owned();
        let waiting = INPUT_PROMPT_SUFFIXES
            .iter()
            .any(|suffix| pending.ends_with(suffix.trim_end()) && raw_tail.ends_with(' '));
        if waiting {
            self.buffer.clear();
            Some(pending)
        } else {
            None
        }
    }

    /// Returns whatever is left in the buffer as a final line.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = self.buffer.split();
        let line = sanitize(&raw);
        if line.is_empty() { None } else { Some(line) }
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Strips terminal control sequences from a raw line.
#[must_use]
pub fn sanitize(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);

    let mut clean = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                // CSI: ESC [ params final-byte
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&next) {
                            break;
                        }
                    }
                } else {
                    chars.next();
                }
            }
            '\r' | '\t' => clean.push(c),
            c if c.is_control() => {}
            c => clean.push(c),
        }
    }

    // Keep the last redraw of the line.
    let visible = clean
        .rsplit('\r')
        .find(|segment| !segment.trim().is_empty())
        .unwrap_or("");
    visible.trim_end().to_string()
}
