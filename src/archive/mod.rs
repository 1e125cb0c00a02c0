pub mod stat;
pub mod tar;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub use self::tar::TarExtractor;
pub use stat::StatRecord;

/// Entries of one archive keyed by their stored name.
pub type FileMap = BTreeMap<String, FileRecord>;

/// Kind of an archive entry, derived from the header type flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Hard links, devices, fifos, and anything else
    Other,
}

impl From<::tar::EntryType> for FileKind {
    fn from(entry_type: ::tar::EntryType) -> Self {
        if entry_type.is_file() {
            FileKind::Regular
        } else if entry_type.is_dir() {
            FileKind::Directory
        } else if entry_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        }
    }
}

/// One entry decoded from an archive stream.
///
/// `content` is `Some` only for regular files; an empty regular file has
/// `Some(vec![])`, every other kind has `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub kind: FileKind,
    pub content: Option<Vec<u8>>,
    pub size: u64,
    pub mode: u32,
    pub mod_time: DateTime<Utc>,
    pub uid: u64,
    pub gid: u64,
    /// Target of a symlink or hard link
    pub link_target: Option<String>,
}

impl FileRecord {
    /// Content as text, replacing invalid UTF-8
    pub fn content_lossy(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Every entry of one archive plus the stat of the requested path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    pub files: FileMap,
    pub stat: StatRecord,
}

impl ArchiveResult {
    /// Entry names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.files.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Compression wrapped around a saved tar capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Tar,
    TarGz,
    TarBz2,
}

impl CaptureFormat {
    /// Detect capture format from file extension; anything unknown is plain tar
    pub fn from_path(path: &str) -> Self {
        let path_lower = path.to_lowercase();
        if path_lower.ends_with(".tar.gz") || path_lower.ends_with(".tgz") {
            return CaptureFormat::TarGz;
        }
        if path_lower.ends_with(".tar.bz2") || path_lower.ends_with(".tbz2") {
            return CaptureFormat::TarBz2;
        }
        CaptureFormat::Tar
    }
}
