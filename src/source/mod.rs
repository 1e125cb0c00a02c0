//! The container runtime as seen by the decoders: something that hands out
//! byte streams for a container path or a container's logs.
//!
//! Transport lives behind [`ContainerSource`] so the decoders never depend on
//! a particular runtime client.

pub mod file;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};

use crate::archive::StatRecord;
use crate::error::SourceError;
use crate::validate::{ContainerName, ContainerPath};

pub use file::CaptureFiles;

/// A byte stream obtained from the runtime.
///
/// Dropping a stream releases it silently; [`close`](CaptureStream::close)
/// releases it and reports whether that succeeded.
pub trait CaptureStream: Read + Send {
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Tar stream for a copy request plus the stat of the requested path.
pub struct ArchiveCapture {
    pub stream: Box<dyn CaptureStream>,
    /// `None` when the runtime sent no stat; one is derived from the archive
    pub stat: Option<StatRecord>,
}

/// What to ask the runtime for when requesting logs.
///
/// Both stdout and stderr are always requested, multiplexed on one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRequest {
    pub timestamps: bool,
}

impl LogRequest {
    pub fn new(timestamps: bool) -> Self {
        LogRequest { timestamps }
    }
}

/// Trait for container runtime transports
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &str;

    /// Open a tar stream of `path` copied out of `container`
    async fn copy_from_container(
        &self,
        container: &ContainerName,
        path: &ContainerPath,
    ) -> Result<ArchiveCapture, SourceError>;

    /// Open the multiplexed log stream of `container`
    async fn container_logs(
        &self,
        container: &ContainerName,
        request: &LogRequest,
    ) -> Result<Box<dyn CaptureStream>, SourceError>;
}

/// In-memory stream over captured bytes
pub struct BytesStream {
    cursor: Cursor<Bytes>,
    close_error: Option<String>,
}

impl BytesStream {
    pub fn new(data: Bytes) -> Self {
        BytesStream {
            cursor: Cursor::new(data),
            close_error: None,
        }
    }

    /// Make [`close`](CaptureStream::close) fail with `message`
    pub fn with_close_error(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }
}

impl Read for BytesStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl CaptureStream for BytesStream {
    fn close(self: Box<Self>) -> io::Result<()> {
        match self.close_error {
            Some(message) => Err(io::Error::other(message)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ContainerCaptures {
    archives: HashMap<String, (Bytes, Option<StatRecord>)>,
    logs: Option<Bytes>,
}

/// A source serving captures held in memory, keyed by container and path.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    containers: HashMap<String, ContainerCaptures>,
    close_error: Option<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `archive` for `path` in `container`; `path` is matched after
    /// sanitizing, so `/etc/hosts` and `etc/hosts` are the same key.
    pub fn with_archive(
        mut self,
        container: &str,
        path: &str,
        archive: impl Into<Bytes>,
        stat: Option<StatRecord>,
    ) -> Self {
        let key = ContainerPath::parse(path)
            .map(|p| p.as_relative())
            .unwrap_or_else(|_| path.to_string());
        self.containers
            .entry(container.to_string())
            .or_default()
            .archives
            .insert(key, (archive.into(), stat));
        self
    }

    pub fn with_logs(mut self, container: &str, logs: impl Into<Bytes>) -> Self {
        self.containers
            .entry(container.to_string())
            .or_default()
            .logs = Some(logs.into());
        self
    }

    /// Every stream handed out fails to close with `message`
    pub fn with_close_error(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }

    fn stream(&self, data: Bytes) -> Box<dyn CaptureStream> {
        let stream = BytesStream::new(data);
        match &self.close_error {
            Some(message) => Box::new(stream.with_close_error(message.clone())),
            None => Box::new(stream),
        }
    }

    fn container(&self, container: &ContainerName) -> Result<&ContainerCaptures, SourceError> {
        self.containers
            .get(container.as_str())
            .ok_or_else(|| SourceError::ContainerNotFound(container.to_string()))
    }
}

#[async_trait]
impl ContainerSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn copy_from_container(
        &self,
        container: &ContainerName,
        path: &ContainerPath,
    ) -> Result<ArchiveCapture, SourceError> {
        let captures = self.container(container)?;
        let (data, stat) = captures
            .archives
            .get(&path.as_relative())
            .ok_or_else(|| SourceError::PathNotFound {
                container: container.to_string(),
                path: path.to_string(),
            })?;

        Ok(ArchiveCapture {
            stream: self.stream(data.clone()),
            stat: stat.clone(),
        })
    }

    async fn container_logs(
        &self,
        container: &ContainerName,
        _request: &LogRequest,
    ) -> Result<Box<dyn CaptureStream>, SourceError> {
        let captures = self.container(container)?;
        let data = captures.logs.clone().unwrap_or_default();
        Ok(self.stream(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ContainerName {
        ContainerName::new(s).unwrap()
    }

    fn path(s: &str) -> ContainerPath {
        ContainerPath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_static_source_serves_archive() {
        let source = StaticSource::new().with_archive("web", "/etc/hosts", &b"tar"[..], None);

        let mut capture = source
            .copy_from_container(&name("web"), &path("etc/hosts"))
            .await
            .unwrap();
        let mut data = Vec::new();
        capture.stream.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"tar");
        assert!(capture.stat.is_none());
        assert!(capture.stream.close().is_ok());
    }

    #[tokio::test]
    async fn test_static_source_unknown_container_and_path() {
        let source = StaticSource::new().with_logs("web", &b""[..]);

        let err = source
            .copy_from_container(&name("db"), &path("x"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::ContainerNotFound(ref c) if c == "db"));

        let err = source
            .copy_from_container(&name("web"), &path("x"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::PathNotFound { .. }));
    }

    #[tokio::test]
    async fn test_static_source_close_error() {
        let source = StaticSource::new()
            .with_logs("web", &b"\x01\x00\x00\x00\x00\x00\x00\x01x\n"[..])
            .with_close_error("broken pipe");

        let stream = source
            .container_logs(&name("web"), &LogRequest::new(false))
            .await
            .unwrap();
        let err = stream.close().unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
    }
}
