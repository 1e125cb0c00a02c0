//! Limits and options consumed by the decoders.

/// Maximum size of a single regular file that can be extracted (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum size of a GNU long-name/long-link or pax extension header (1 MiB).
pub const MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Maximum length of one log line, framing included (64 KiB).
pub const MAX_LOG_LINE_LEN: usize = 64 * 1024;

/// Resource limits for archive extraction.
///
/// A regular file whose header declares more than `max_file_size` bytes is
/// rejected before its body is read. GNU long-name/long-link and pax headers
/// are held in memory whole, so they get their own, smaller ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_file_size: u64,
    pub max_extension_size: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_extension_size: MAX_EXTENSION_SIZE,
        }
    }
}

impl ExtractLimits {
    /// Limits for captures from a trusted runtime.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_file_size: u64::MAX,
            max_extension_size: u64::MAX,
        }
    }
}

/// Options for decoding a multiplexed log capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    /// Whether every line carries a timestamp after the frame header.
    /// The runtime is asked for timestamps unless the caller opts out.
    pub timestamps: bool,
    pub max_line_len: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            max_line_len: MAX_LOG_LINE_LEN,
        }
    }
}

impl LogOptions {
    #[must_use]
    pub fn with_timestamps(timestamps: bool) -> Self {
        Self {
            timestamps,
            ..Default::default()
        }
    }
}

/// Everything the read operations need, with defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub limits: ExtractLimits,
    pub logs: LogOptions,
}
