use chrono::DateTime;
use std::io::{self, ErrorKind, Read};
use tracing::{debug, warn};

use super::{ArchiveResult, FileKind, FileMap, FileRecord, StatRecord};
use crate::config::ExtractLimits;
use crate::error::ExtractError;

/// Reads a tar capture into [`FileRecord`]s.
///
/// Extraction is all-or-nothing: the first bad entry aborts the whole read and
/// nothing decoded so far is returned.
#[derive(Debug, Clone, Default)]
pub struct TarExtractor {
    limits: ExtractLimits,
}

/// Overrides announced by extension headers for the next real entry
#[derive(Debug, Default)]
struct Extensions {
    path: Option<String>,
    link_target: Option<String>,
    size: Option<u64>,
    uid: Option<u64>,
    gid: Option<u64>,
    mtime: Option<u64>,
}

impl Extensions {
    fn is_empty(&self) -> bool {
        self.path.is_none()
            && self.link_target.is_none()
            && self.size.is_none()
            && self.uid.is_none()
            && self.gid.is_none()
            && self.mtime.is_none()
    }

    fn apply_pax(&mut self, key: &str, value: &[u8]) {
        let text = String::from_utf8_lossy(value);
        match key {
            "path" => self.path = Some(text.into_owned()),
            "linkpath" => self.link_target = Some(text.into_owned()),
            "size" => self.size = text.parse().ok(),
            "uid" => self.uid = text.parse().ok(),
            "gid" => self.gid = text.parse().ok(),
            // Sub-second precision is dropped
            "mtime" => self.mtime = text.split('.').next().and_then(|secs| secs.parse().ok()),
            _ => {}
        }
    }
}

impl TarExtractor {
    pub fn new(limits: ExtractLimits) -> Self {
        TarExtractor { limits }
    }

    /// Extract every entry of the archive, keyed by stored name.
    ///
    /// End of stream, with or without the end-of-archive marker, ends the
    /// archive. A later entry with the same name replaces an earlier one.
    ///
    /// Extension headers are read here rather than by `tar`, so their size is
    /// checked against [`ExtractLimits::max_extension_size`] before any of
    /// their body is buffered.
    pub fn extract_all<R: Read>(&self, reader: R) -> Result<FileMap, ExtractError> {
        let mut archive = tar::Archive::new(reader);
        let mut files = FileMap::new();
        let mut pending = Extensions::default();

        let entries = archive
            .entries()
            .map_err(ExtractError::MalformedArchive)?
            .raw(true);
        for entry_result in entries {
            let mut entry = entry_result.map_err(ExtractError::MalformedArchive)?;
            if self.read_extension(&mut entry, &mut pending)? {
                continue;
            }

            let record = self.read_entry(&mut entry, std::mem::take(&mut pending))?;
            debug!(
                name = %record.name,
                kind = ?record.kind,
                size = record.size,
                "extracted tar entry"
            );

            if let Some(previous) = files.insert(record.name.clone(), record) {
                warn!(name = %previous.name, "duplicate tar entry name, keeping the later entry");
            }
        }

        if !pending.is_empty() {
            return Err(ExtractError::MalformedArchive(io::Error::new(
                ErrorKind::UnexpectedEof,
                "extension header without a following entry",
            )));
        }

        Ok(files)
    }

    /// Extract an archive expected to hold exactly one entry.
    ///
    /// Fails with [`ExtractError::NotFound`] on an empty archive and with
    /// [`ExtractError::AmbiguousTarget`] when more than one entry is present.
    /// Without a runtime-supplied `stat`, the entry's own metadata is used.
    pub fn extract_one<R: Read>(
        &self,
        reader: R,
        stat: Option<StatRecord>,
    ) -> Result<(FileRecord, StatRecord), ExtractError> {
        let mut files = self.extract_all(reader)?;

        if files.len() > 1 {
            return Err(ExtractError::AmbiguousTarget {
                names: files.into_keys().collect(),
            });
        }

        let (_, record) = files.pop_first().ok_or(ExtractError::NotFound)?;
        let stat = stat.unwrap_or_else(|| StatRecord::from_record(&record));
        Ok((record, stat))
    }

    /// Extract every entry and pair the map with the requested path's stat.
    ///
    /// Without a runtime-supplied `stat`, the archive's top-level entry is
    /// used; [`ExtractError::MissingStat`] if it has none.
    pub fn extract_result<R: Read>(
        &self,
        reader: R,
        stat: Option<StatRecord>,
    ) -> Result<ArchiveResult, ExtractError> {
        let files = self.extract_all(reader)?;
        let stat = match stat {
            Some(stat) => stat,
            None => StatRecord::from_top_level(&files).ok_or(ExtractError::MissingStat)?,
        };
        Ok(ArchiveResult { files, stat })
    }

    /// Fold a GNU long-name/long-link or pax header into `pending`.
    ///
    /// Returns `false` for any other entry, leaving it unread.
    fn read_extension<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        pending: &mut Extensions,
    ) -> Result<bool, ExtractError> {
        let entry_type = entry.header().entry_type();
        let is_extension = entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_pax_global_extensions();
        if !is_extension {
            return Ok(false);
        }

        let size = entry.size();
        let max = self.limits.max_extension_size;
        if size > max {
            return Err(ExtractError::ExtensionTooLarge { size, max });
        }

        if entry_type.is_pax_local_extensions() {
            let extensions = entry
                .pax_extensions()
                .map_err(ExtractError::MalformedArchive)?;
            for extension in extensions.into_iter().flatten() {
                let extension = extension.map_err(ExtractError::MalformedArchive)?;
                if let Ok(key) = extension.key() {
                    pending.apply_pax(key, extension.value_bytes());
                }
            }
        } else if entry_type.is_gnu_longname() || entry_type.is_gnu_longlink() {
            let mut body = read_body(entry, "././@LongLink", size)?;
            while body.last() == Some(&0) {
                body.pop();
            }
            let value = String::from_utf8_lossy(&body).into_owned();
            if entry_type.is_gnu_longname() {
                pending.path = Some(value);
            } else {
                pending.link_target = Some(value);
            }
        }
        // Global pax headers carry nothing per entry; their body is skipped

        Ok(true)
    }

    fn read_entry<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        pending: Extensions,
    ) -> Result<FileRecord, ExtractError> {
        let name = match pending.path {
            Some(path) => path,
            None => String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
        };
        let link_target = pending.link_target.or_else(|| {
            entry
                .link_name_bytes()
                .map(|target| String::from_utf8_lossy(&target).into_owned())
        });
        let stored_size = entry.size();
        let size = pending.size.unwrap_or(stored_size);

        let header = entry.header();
        let raw = header.as_old();
        let kind = FileKind::from(header.entry_type());
        let mode = numeric_field(&raw.mode, header.mode())?;
        let uid = match pending.uid {
            Some(uid) => uid,
            None => numeric_field(&raw.uid, header.uid())?,
        };
        let gid = match pending.gid {
            Some(gid) => gid,
            None => numeric_field(&raw.gid, header.gid())?,
        };
        let mtime = match pending.mtime {
            Some(mtime) => mtime,
            None => numeric_field(&raw.mtime, header.mtime())?,
        };
        let mod_time = i64::try_from(mtime)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();

        let content = if kind == FileKind::Regular {
            // Checked before reading so a hostile header cannot make us buffer it
            if size > self.limits.max_file_size {
                return Err(ExtractError::FileTooLarge {
                    name,
                    size,
                    max: self.limits.max_file_size,
                });
            }
            if size != stored_size {
                return Err(ExtractError::MalformedArchive(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("pax size {size} of {name} disagrees with header size {stored_size}"),
                )));
            }
            Some(read_body(entry, &name, size)?)
        } else {
            None
        };

        Ok(FileRecord {
            name,
            kind,
            content,
            size,
            mode,
            mod_time,
            uid,
            gid,
            link_target,
        })
    }
}

/// A numeric header field left blank (NULs or spaces) reads as zero
fn numeric_field<T: Default>(raw: &[u8], parsed: io::Result<T>) -> Result<T, ExtractError> {
    if raw.iter().all(|&b| b == 0 || b == b' ') {
        return Ok(T::default());
    }
    parsed.map_err(ExtractError::MalformedArchive)
}

/// Read exactly `size` bytes of entry body
fn read_body<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    name: &str,
    size: u64,
) -> Result<Vec<u8>, ExtractError> {
    let mut buffer = Vec::new();

    match entry.read_to_end(&mut buffer) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
        Err(e) => {
            return Err(ExtractError::Read {
                name: name.to_string(),
                source: e,
            });
        }
    }

    if buffer.len() as u64 != size {
        return Err(ExtractError::TruncatedEntry {
            name: name.to_string(),
            expected: size,
            actual: buffer.len() as u64,
        });
    }

    Ok(buffer)
}
