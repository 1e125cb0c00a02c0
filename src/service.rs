//! Read operations: validate the request, open a stream from the runtime,
//! decode it off the async executor and release the stream.

use std::fmt;
use std::io::{self, BufReader, Read};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::{ArchiveResult, FileRecord, StatRecord, TarExtractor};
use crate::config::Config;
use crate::error::{FetchError, SourceError, ValidationError};
use crate::logs::{LogDecoder, LogRecord};
use crate::source::{CaptureStream, ContainerSource, LogRequest};
use crate::validate::{ContainerName, ContainerPath};

const CLEANUP_SUMMARY: &str = "Resource Cleanup Warning";

/// A stream that could not be released cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub summary: String,
    pub detail: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// A decoded value plus any warnings raised while releasing its stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub warnings: Vec<CleanupWarning>,
}

/// A failed read plus any warnings raised while releasing its stream
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FetchFailure {
    pub error: FetchError,
    pub warnings: Vec<CleanupWarning>,
}

impl FetchFailure {
    pub fn into_parts(self) -> (FetchError, Vec<CleanupWarning>) {
        (self.error, self.warnings)
    }
}

impl From<FetchError> for FetchFailure {
    fn from(error: FetchError) -> Self {
        FetchFailure {
            error,
            warnings: Vec::new(),
        }
    }
}

impl From<ValidationError> for FetchFailure {
    fn from(error: ValidationError) -> Self {
        FetchError::from(error).into()
    }
}

impl From<SourceError> for FetchFailure {
    fn from(error: SourceError) -> Self {
        FetchError::from(error).into()
    }
}

/// Reads files and logs out of containers through a [`ContainerSource`].
#[derive(Clone)]
pub struct ContainerReader {
    source: Arc<dyn ContainerSource>,
    config: Config,
}

impl ContainerReader {
    pub fn new(source: Arc<dyn ContainerSource>) -> Self {
        Self::with_config(source, Config::default())
    }

    pub fn with_config(source: Arc<dyn ContainerSource>, config: Config) -> Self {
        ContainerReader { source, config }
    }

    /// Read exactly one file at `path` in `container`.
    pub async fn read_file(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Fetched<(FileRecord, StatRecord)>, FetchFailure> {
        let container = ContainerName::new(container)?;
        let path = ContainerPath::parse(path)?;
        let capture = self.source.copy_from_container(&container, &path).await?;
        debug!(source = self.source.name(), %container, %path, "reading file");

        let extractor = TarExtractor::new(self.config.limits);
        let stat = capture.stat;
        let (result, closed) =
            decode_blocking(capture.stream, move |reader| extractor.extract_one(reader, stat))
                .await?;

        let target = path.to_string();
        let subject = format!("file stream for {target:?} from container {:?}", container.as_str());
        settle(result, closed, &subject, |source| FetchError::Extract {
            path: target,
            source,
        })
    }

    /// Read every entry under `path` in `container`.
    pub async fn read_files(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Fetched<ArchiveResult>, FetchFailure> {
        let container = ContainerName::new(container)?;
        let path = ContainerPath::parse(path)?;
        let capture = self.source.copy_from_container(&container, &path).await?;
        debug!(source = self.source.name(), %container, %path, "reading files");

        let extractor = TarExtractor::new(self.config.limits);
        let stat = capture.stat;
        let (result, closed) = decode_blocking(capture.stream, move |reader| {
            extractor.extract_result(reader, stat)
        })
        .await?;

        let target = path.to_string();
        let subject = format!("files stream for {target:?} from container {:?}", container.as_str());
        settle(result, closed, &subject, |source| FetchError::Extract {
            path: target,
            source,
        })
    }

    /// Read the stdout and stderr log of `container`.
    ///
    /// `timestamps` overrides the configured timestamp mode when given.
    pub async fn read_logs(
        &self,
        container: &str,
        timestamps: Option<bool>,
    ) -> Result<Fetched<Vec<LogRecord>>, FetchFailure> {
        let container = ContainerName::new(container)?;
        let mut options = self.config.logs;
        if let Some(timestamps) = timestamps {
            options.timestamps = timestamps;
        }

        let request = LogRequest::new(options.timestamps);
        let stream = self.source.container_logs(&container, &request).await?;
        debug!(source = self.source.name(), %container, timestamps = options.timestamps, "reading logs");

        let decoder = LogDecoder::new(options);
        let (result, closed) =
            decode_blocking(stream, move |reader| decoder.decode(BufReader::new(reader))).await?;

        let subject = format!("log stream for container {:?}", container.as_str());
        settle(result, closed, &subject, |source| FetchError::Decode {
            container: container.to_string(),
            source,
        })
    }
}

/// Run `decode` on the blocking pool, then close the stream whatever the
/// outcome.
async fn decode_blocking<T, E, F>(
    mut stream: Box<dyn CaptureStream>,
    decode: F,
) -> Result<(Result<T, E>, io::Result<()>), FetchError>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&mut dyn Read) -> Result<T, E> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        let result = decode(&mut stream);
        if let Err(e) = stream.close() {
            warn!(error = %e, "failed to release capture stream");
            return (result, Err(e));
        }
        (result, Ok(()))
    })
    .await?;
    Ok(outcome)
}

/// Pair the decode outcome with the close outcome. A close failure becomes a
/// warning on either side; it never replaces the decode error.
fn settle<T, E>(
    result: Result<T, E>,
    closed: io::Result<()>,
    subject: &str,
    wrap: impl FnOnce(E) -> FetchError,
) -> Result<Fetched<T>, FetchFailure> {
    let warnings = match closed {
        Ok(()) => Vec::new(),
        Err(e) => vec![CleanupWarning {
            summary: CLEANUP_SUMMARY.to_string(),
            detail: format!("Failed to close {subject}: {e}"),
        }],
    };
    match result {
        Ok(value) => Ok(Fetched { value, warnings }),
        Err(e) => Err(FetchFailure {
            error: wrap(e),
            warnings,
        }),
    }
}
