//! Error types for validation, archive extraction and log decoding.
//!
//! Every variant carries the value that broke the rule so the caller can
//! report it without re-inspecting the input.

use thiserror::Error;

/// Caller input rejected before any stream is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Container identifier was empty.
    #[error("container name cannot be empty")]
    EmptyIdentifier,

    /// Container identifier does not match `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
    #[error(
        "invalid container name format (must start with letter/number, then can contain letters/numbers/underscore/period/dash): {0}"
    )]
    InvalidFormat(String),

    /// Requested path was empty.
    #[error("path cannot be empty")]
    EmptyPath,

    /// Requested path contains a parent-directory component.
    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    /// Requested path contains a NUL byte.
    #[error("path contains a NUL byte: {0:?}")]
    NulByte(String),
}

/// Failure while reading a tar capture.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Header could not be decoded (short block, bad checksum, bad field).
    #[error("malformed archive: {0}")]
    MalformedArchive(#[source] std::io::Error),

    /// Regular file declares more bytes than the configured ceiling.
    #[error("file too large: {name}: {size} bytes exceeds maximum allowed size of {max} bytes")]
    FileTooLarge {
        /// Entry name.
        name: String,
        /// Declared size from the header.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// GNU long-name/long-link or pax header larger than the configured ceiling.
    #[error("extension header too large: {size} bytes exceeds maximum allowed size of {max} bytes")]
    ExtensionTooLarge {
        /// Declared size from the header.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Stream ended before the declared body was read.
    #[error("truncated entry: {name}: expected {expected} bytes, got {actual}")]
    TruncatedEntry {
        /// Entry name.
        name: String,
        /// Declared size from the header.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// I/O failure while reading an entry body.
    #[error("failed to read entry {name}: {source}")]
    Read {
        /// Entry name.
        name: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Single-target read found no entries.
    #[error("no files were found in tar stream")]
    NotFound,

    /// Single-target read found more than one entry.
    #[error("expected exactly one file in tar stream, but found {}: {names:?}", names.len())]
    AmbiguousTarget {
        /// Every entry name in the archive, sorted.
        names: Vec<String>,
    },

    /// No stat was supplied and none could be derived from the entries.
    #[error("no stat reported for the requested path and the archive has no top-level entry")]
    MissingStat,
}

/// Failure while decoding a multiplexed log capture.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A line with no bytes at all.
    #[error("line {line}: empty log line")]
    EmptyLine {
        /// 1-based line number.
        line: usize,
    },

    /// Stream marker `0x00` (stdin) is never produced by a log capture.
    #[error("line {line}: unexpected stdin log line")]
    UnexpectedStdin {
        /// 1-based line number.
        line: usize,
    },

    /// Stream marker other than stdout/stderr.
    #[error("line {line}: unknown log line type: {marker:#04x}")]
    UnknownStreamMarker {
        /// 1-based line number.
        line: usize,
        /// Observed marker byte.
        marker: u8,
    },

    /// Line shorter than the fixed framing of the active mode.
    #[error("line {line}: log line too short: need at least {needed} bytes, got {actual}")]
    LineTooShort {
        /// 1-based line number.
        line: usize,
        /// Minimum length for the active mode.
        needed: usize,
        /// Observed length.
        actual: usize,
    },

    /// Line longer than the configured bound.
    #[error("line {line}: log line exceeds limit of {limit} bytes")]
    LineTooLong {
        /// 1-based line number.
        line: usize,
        /// Configured bound.
        limit: usize,
    },

    /// I/O failure from the underlying stream.
    #[error("failed to read log stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a [`ContainerSource`](crate::source::ContainerSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The runtime does not know the container.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The runtime does not know the path inside the container.
    #[error("path not found in container {container}: {path}")]
    PathNotFound {
        /// Container name.
        container: String,
        /// Requested path.
        path: String,
    },

    /// The path-stat header could not be decoded.
    #[error("invalid path stat header: {0}")]
    InvalidStat(String),

    /// I/O failure while opening the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a full read operation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("unable to read from container runtime: {0}")]
    Source(#[from] SourceError),

    #[error("error extracting files from tar stream for {path:?}: {source}")]
    Extract {
        path: String,
        #[source]
        source: ExtractError,
    },

    #[error("error processing logs for container {container:?}: {source}")]
    Decode {
        container: String,
        #[source]
        source: DecodeError,
    },

    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_target_lists_names() {
        let err = ExtractError::AmbiguousTarget {
            names: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("\"b\""));
    }

    #[test]
    fn test_unknown_marker_renders_hex() {
        let err = DecodeError::UnknownStreamMarker { line: 3, marker: 3 };
        assert_eq!(err.to_string(), "line 3: unknown log line type: 0x03");
    }

    #[test]
    fn test_fetch_error_wraps_validation() {
        let err: FetchError = ValidationError::EmptyPath.into();
        assert!(matches!(err, FetchError::Validation(ValidationError::EmptyPath)));
        assert_eq!(err.to_string(), "invalid input: path cannot be empty");
    }

    #[test]
    fn test_fetch_error_names_target() {
        let err = FetchError::Extract {
            path: "etc/hosts".to_string(),
            source: ExtractError::NotFound,
        };
        assert_eq!(
            err.to_string(),
            "error extracting files from tar stream for \"etc/hosts\": no files were found in tar stream"
        );
    }
}
