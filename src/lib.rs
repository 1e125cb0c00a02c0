//! Decoders for the byte streams a container runtime hands out: tar captures
//! of container paths and multiplexed log streams, plus validation of the
//! container names and paths used to request them.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod output;
pub mod service;
pub mod source;
pub mod validate;

pub use archive::{ArchiveResult, FileKind, FileMap, FileRecord, StatRecord, TarExtractor};
pub use config::{Config, ExtractLimits, LogOptions};
pub use error::{DecodeError, ExtractError, FetchError, SourceError, ValidationError};
pub use logs::{LogDecoder, LogRecord, Origin};
pub use service::{CleanupWarning, ContainerReader, FetchFailure, Fetched};
pub use source::{CaptureStream, ContainerSource, StaticSource};
pub use validate::{sanitize_path, validate_container_name};
