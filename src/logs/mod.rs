//! Multiplexed container log captures.
//!
//! Each line starts with an 8-byte frame header whose first byte names the
//! stream the line came from. When the runtime was asked for timestamps, a
//! fixed-width timestamp region and separator follow the header:
//!
//! ```text
//! 0        8                      30        39
//! | header | timestamp (22 bytes) | sep (9) | message ...
//! ```
//!
//! Offsets are positional and assume single-byte characters up to the
//! message; the message itself may hold any UTF-8.

pub mod decoder;

use serde::Serialize;

pub use decoder::LogDecoder;

/// Width of the frame header that starts every line.
pub const HEADER_WIDTH: usize = 8;

/// Width of the timestamp region that follows the header.
pub const TIMESTAMP_WIDTH: usize = 22;

/// Bytes between the timestamp region and the message, discarded.
pub const SEPARATOR_WIDTH: usize = 9;

/// End of the timestamp region (exclusive).
pub const TIMESTAMP_END: usize = HEADER_WIDTH + TIMESTAMP_WIDTH;

/// Start of the message when timestamps are present; also the minimum length
/// of a timestamped line.
pub const MESSAGE_OFFSET: usize = TIMESTAMP_END + SEPARATOR_WIDTH;

pub const STDIN_MARKER: u8 = 0x00;
pub const STDOUT_MARKER: u8 = 0x01;
pub const STDERR_MARKER: u8 = 0x02;

/// Stream a log line was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Stdout,
    Stderr,
}

/// One decoded log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub origin: Origin,
    /// Present only when the capture was decoded with timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub message: String,
}

impl LogRecord {
    pub fn is_stdout(&self) -> bool {
        self.origin == Origin::Stdout
    }

    pub fn is_stderr(&self) -> bool {
        self.origin == Origin::Stderr
    }
}
