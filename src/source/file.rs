//! Replays captures saved to disk, e.g. the output of
//! `docker cp CONTAINER:PATH -` or a raw log stream.

use async_trait::async_trait;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ArchiveCapture, CaptureStream, ContainerSource, LogRequest};
use crate::archive::{CaptureFormat, StatRecord};
use crate::error::SourceError;
use crate::validate::{ContainerName, ContainerPath};

/// Path that stands for standard input
pub const STDIN_PATH: &str = "-";

/// A source that answers every request from files on disk, regardless of the
/// container or path asked for.
#[derive(Debug, Clone, Default)]
pub struct CaptureFiles {
    archive: Option<PathBuf>,
    logs: Option<PathBuf>,
    stat: Option<StatRecord>,
}

impl CaptureFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tar capture served for copy requests; `.tar.gz`/`.tgz` and
    /// `.tar.bz2`/`.tbz2` are decompressed
    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive = Some(path.into());
        self
    }

    /// Log capture served for log requests
    pub fn with_logs(mut self, path: impl Into<PathBuf>) -> Self {
        self.logs = Some(path.into());
        self
    }

    /// Stat reported for the copied path
    pub fn with_stat(mut self, stat: StatRecord) -> Self {
        self.stat = Some(stat);
        self
    }
}

/// Stream over a local file or stdin
pub struct FileStream {
    reader: Box<dyn Read + Send>,
}

impl FileStream {
    /// Open `path` (or stdin for `-`), decompressing per `format`
    pub fn open(path: &Path, format: CaptureFormat) -> io::Result<Self> {
        let raw: Box<dyn Read + Send> = if path.as_os_str() == STDIN_PATH {
            Box::new(io::stdin())
        } else {
            Box::new(File::open(path)?)
        };

        let reader: Box<dyn Read + Send> = match format {
            CaptureFormat::Tar => raw,
            CaptureFormat::TarGz => Box::new(flate2::read::GzDecoder::new(raw)),
            CaptureFormat::TarBz2 => Box::new(bzip2::read::BzDecoder::new(raw)),
        };

        Ok(FileStream { reader })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl CaptureStream for FileStream {
    fn close(self: Box<Self>) -> io::Result<()> {
        // Files close on drop and report nothing
        Ok(())
    }
}

fn missing(what: &str) -> SourceError {
    SourceError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no {what} capture configured"),
    ))
}

#[async_trait]
impl ContainerSource for CaptureFiles {
    fn name(&self) -> &str {
        "capture-files"
    }

    async fn copy_from_container(
        &self,
        container: &ContainerName,
        path: &ContainerPath,
    ) -> Result<ArchiveCapture, SourceError> {
        let archive = self.archive.as_deref().ok_or_else(|| missing("archive"))?;
        let format = CaptureFormat::from_path(&archive.to_string_lossy());
        debug!(%container, %path, capture = %archive.display(), ?format, "replaying archive capture");

        let stream = FileStream::open(archive, format)?;
        Ok(ArchiveCapture {
            stream: Box::new(stream),
            stat: self.stat.clone(),
        })
    }

    async fn container_logs(
        &self,
        container: &ContainerName,
        request: &LogRequest,
    ) -> Result<Box<dyn CaptureStream>, SourceError> {
        let logs = self.logs.as_deref().ok_or_else(|| missing("log"))?;
        debug!(%container, capture = %logs.display(), timestamps = request.timestamps, "replaying log capture");

        let stream = FileStream::open(logs, CaptureFormat::Tar)?;
        Ok(Box::new(stream))
    }
}
