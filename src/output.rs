//! Rendering of decoded captures as text or JSON.
//!
//! Writers return plain `io::Result`; the binary treats `BrokenPipe` (output
//! piped to `head`) as a normal exit.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::*;
use serde::Serialize;
use std::io::{self, Write};

use crate::archive::{ArchiveResult, FileKind, FileRecord, StatRecord};
use crate::cli::Format;
use crate::logs::LogRecord;
use crate::service::CleanupWarning;

/// JSON view of one archive entry
#[derive(Debug, Serialize)]
struct FileView<'a> {
    name: &'a str,
    kind: FileKind,
    size: u64,
    mode: String,
    mod_time: String,
    uid: u64,
    gid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<&'a str>,
    /// Set only when the content is valid UTF-8
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_base64: Option<String>,
}

impl<'a> From<&'a FileRecord> for FileView<'a> {
    fn from(record: &'a FileRecord) -> Self {
        let content = record.content.as_deref();
        FileView {
            name: &record.name,
            kind: record.kind,
            size: record.size,
            mode: format!("{:04o}", record.mode),
            mod_time: record.mod_time.to_rfc3339(),
            uid: record.uid,
            gid: record.gid,
            link_target: record.link_target.as_deref(),
            content: content.and_then(|bytes| std::str::from_utf8(bytes).ok()),
            content_base64: content.map(|bytes| STANDARD.encode(bytes)),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileOutput<'a> {
    stat: &'a StatRecord,
    file: FileView<'a>,
}

#[derive(Debug, Serialize)]
struct FilesOutput<'a> {
    stat: &'a StatRecord,
    files: Vec<FileView<'a>>,
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(io::Error::other)?;
    writeln!(writer)
}

/// Write the single file of a `file` read.
///
/// Text output is the raw content; entries without content get a one-line
/// description instead.
pub fn write_file<W: Write>(
    writer: &mut W,
    format: Format,
    record: &FileRecord,
    stat: &StatRecord,
) -> io::Result<()> {
    match format {
        Format::Json => write_json(
            writer,
            &FileOutput {
                stat,
                file: FileView::from(record),
            },
        ),
        Format::Text => match &record.content {
            Some(content) => writer.write_all(content),
            None => writeln!(writer, "{}", describe(record)),
        },
    }
}

/// Write the listing of a `files` read, one entry per line.
pub fn write_files<W: Write>(
    writer: &mut W,
    format: Format,
    result: &ArchiveResult,
) -> io::Result<()> {
    match format {
        Format::Json => write_json(
            writer,
            &FilesOutput {
                stat: &result.stat,
                files: result.files.values().map(FileView::from).collect(),
            },
        ),
        Format::Text => {
            for record in result.files.values() {
                writeln!(writer, "{}", describe(record))?;
            }
            writeln!(
                writer,
                "{} entries under {} ({:04o})",
                result.len(),
                result.stat.name.bold(),
                result.stat.mode & 0o7777
            )
        }
    }
}

/// Write decoded log records.
pub fn write_logs<W: Write>(writer: &mut W, format: Format, records: &[LogRecord]) -> io::Result<()> {
    match format {
        Format::Json => write_json(writer, &records),
        Format::Text => {
            for record in records {
                let origin = if record.is_stderr() {
                    "stderr".red()
                } else {
                    "stdout".normal()
                };
                match &record.timestamp {
                    Some(ts) => writeln!(writer, "{} {origin} {}", ts.dimmed(), record.message)?,
                    None => writeln!(writer, "{origin} {}", record.message)?,
                }
            }
            Ok(())
        }
    }
}

/// Report cleanup warnings the way failures are reported, on stderr.
pub fn write_warnings<W: Write>(writer: &mut W, warnings: &[CleanupWarning]) -> io::Result<()> {
    for warning in warnings {
        writeln!(writer, "{} {warning}", "Warning:".yellow().bold())?;
    }
    Ok(())
}

/// `ls -l` style line for one entry
fn describe(record: &FileRecord) -> String {
    let size = humansize::format_size(record.size, humansize::BINARY);
    let name = match record.kind {
        FileKind::Directory => record.name.blue().bold().to_string(),
        FileKind::Symlink => record.name.cyan().to_string(),
        _ => record.name.clone(),
    };
    let mut line = format!(
        "{} {:04o} {:>5}:{:<5} {:>10} {} {}",
        kind_char(record.kind),
        record.mode & 0o7777,
        record.uid,
        record.gid,
        size,
        record.mod_time.format("%Y-%m-%d %H:%M"),
        name
    );
    if let Some(target) = &record.link_target {
        line.push_str(&format!(" -> {target}"));
    }
    line
}

fn kind_char(kind: FileKind) -> char {
    match kind {
        FileKind::Regular => '-',
        FileKind::Directory => 'd',
        FileKind::Symlink => 'l',
        FileKind::Other => '?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(name: &str, kind: FileKind, content: Option<&[u8]>) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            kind,
            content: content.map(|c| c.to_vec()),
            size: content.map_or(0, |c| c.len() as u64),
            mode: 0o644,
            mod_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            uid: 1000,
            gid: 1000,
            link_target: None,
        }
    }

    fn stat(name: &str) -> StatRecord {
        StatRecord {
            name: name.to_string(),
            size: 0,
            mode: 0o755,
            mod_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            link_target: String::new(),
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_file_text_is_raw_content() {
        let hosts = record("hosts", FileKind::Regular, Some(b"127.0.0.1 localhost\n"));
        let out = render(|w| write_file(w, Format::Text, &hosts, &stat("hosts")));
        assert_eq!(out, "127.0.0.1 localhost\n");
    }

    #[test]
    fn test_file_json_carries_both_encodings() {
        let hosts = record("hosts", FileKind::Regular, Some(b"hi"));
        let out = render(|w| write_file(w, Format::Json, &hosts, &stat("hosts")));
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["file"]["content"], "hi");
        assert_eq!(json["file"]["content_base64"], "aGk=");
        assert_eq!(json["file"]["kind"], "regular");
        assert_eq!(json["file"]["mode"], "0644");
        assert_eq!(json["stat"]["name"], "hosts");
    }

    #[test]
    fn test_binary_content_has_no_text_field() {
        let blob = record("blob", FileKind::Regular, Some(&[0xff, 0xfe]));
        let out = render(|w| write_file(w, Format::Json, &blob, &stat("blob")));
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(json["file"].get("content").is_none());
        assert_eq!(json["file"]["content_base64"], "//4=");
    }

    #[test]
    fn test_files_text_listing() {
        let mut files = crate::archive::FileMap::new();
        let mut link = record("app/current", FileKind::Symlink, None);
        link.link_target = Some("v2".to_string());
        files.insert("app/".to_string(), record("app/", FileKind::Directory, None));
        files.insert(link.name.clone(), link);
        files.insert(
            "app/main.py".to_string(),
            record("app/main.py", FileKind::Regular, Some(&[b'x'; 2048])),
        );
        let result = ArchiveResult {
            files,
            stat: stat("app"),
        };

        let out = render(|w| write_files(w, Format::Text, &result));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("d 0644"));
        assert!(lines[1].starts_with("l "));
        assert!(lines[1].ends_with("app/current -> v2"));
        assert!(lines[2].contains("2 KiB"));
        assert_eq!(lines[3], "3 entries under app (0755)");
    }

    #[test]
    fn test_logs_text_and_json() {
        let records = vec![
            LogRecord {
                origin: crate::logs::Origin::Stdout,
                timestamp: Some("2024-01-01T00:00:00.00".to_string()),
                message: "ready".to_string(),
            },
            LogRecord {
                origin: crate::logs::Origin::Stderr,
                timestamp: None,
                message: "oops".to_string(),
            },
        ];

        let out = render(|w| write_logs(w, Format::Text, &records));
        assert_eq!(out, "2024-01-01T00:00:00.00 stdout ready\nstderr oops\n");

        let out = render(|w| write_logs(w, Format::Json, &records));
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["origin"], "stdout");
        assert!(json[1].get("timestamp").is_none());
    }

    #[test]
    fn test_warnings() {
        let warnings = vec![CleanupWarning {
            summary: "Resource Cleanup Warning".to_string(),
            detail: "Failed to close log stream for container \"web\": reset".to_string(),
        }];
        let out = render(|w| write_warnings(w, &warnings));
        assert_eq!(
            out,
            "Warning: Resource Cleanup Warning: Failed to close log stream for container \"web\": reset\n"
        );
    }
}
