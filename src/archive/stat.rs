//! Stat of the top-level path a copy request named.
//!
//! The runtime sends this alongside the tar stream as a header whose value is
//! base64 (standard alphabet) over a JSON object:
//!
//! ```text
//! {"name":"hosts","size":174,"mode":420,"mtime":"2024-01-01T00:00:00Z","linkTarget":""}
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FileMap, FileRecord};
use crate::error::SourceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub name: String,
    pub size: u64,
    pub mode: u32,
    #[serde(rename = "mtime")]
    pub mod_time: DateTime<Utc>,
    #[serde(rename = "linkTarget", default)]
    pub link_target: String,
}

impl StatRecord {
    /// Decode the runtime's path-stat header value.
    pub fn from_header(value: &str) -> Result<Self, SourceError> {
        let json = STANDARD
            .decode(value.trim())
            .map_err(|e| SourceError::InvalidStat(format!("bad base64: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| SourceError::InvalidStat(format!("bad JSON: {e}")))
    }

    /// Stat synthesized from an archive entry when the runtime sent none.
    ///
    /// `mode` carries the entry's permission bits only.
    pub fn from_record(record: &FileRecord) -> Self {
        let name = record
            .name
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        StatRecord {
            name,
            size: record.size,
            mode: record.mode,
            mod_time: record.mod_time,
            link_target: record.link_target.clone().unwrap_or_default(),
        }
    }

    /// Stat of the first entry that sits at the top of the archive.
    pub fn from_top_level(files: &FileMap) -> Option<Self> {
        files
            .values()
            .find(|record| {
                let name = record.name.trim_end_matches('/');
                !name.is_empty() && !name.contains('/')
            })
            .map(Self::from_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::FileKind;

    #[test]
    fn test_from_header() {
        let json = r#"{"name":"hosts","size":174,"mode":420,"mtime":"2024-01-01T00:00:00Z","linkTarget":""}"#;
        let header = STANDARD.encode(json);

        let stat = StatRecord::from_header(&header).unwrap();
        assert_eq!(stat.name, "hosts");
        assert_eq!(stat.size, 174);
        assert_eq!(stat.mode, 0o644);
        assert_eq!(stat.mod_time.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(stat.link_target, "");
    }

    #[test]
    fn test_from_header_symlink_and_nanos() {
        let json = r#"{"name":"current","size":7,"mode":134218239,"mtime":"2024-05-06T07:08:09.123456789+02:00","linkTarget":"/opt/v2"}"#;
        let stat = StatRecord::from_header(&STANDARD.encode(json)).unwrap();
        assert_eq!(stat.link_target, "/opt/v2");
        assert_eq!(stat.mod_time.timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(stat.mod_time.to_rfc3339(), "2024-05-06T05:08:09.123456789+00:00");
    }

    #[test]
    fn test_from_header_rejects_garbage() {
        assert!(matches!(
            StatRecord::from_header("not base64!!"),
            Err(SourceError::InvalidStat(_))
        ));
        assert!(matches!(
            StatRecord::from_header(&STANDARD.encode("{\"name\":1}")),
            Err(SourceError::InvalidStat(_))
        ));
    }

    #[test]
    fn test_serializes_runtime_field_names() {
        let stat = StatRecord {
            name: "app".to_string(),
            size: 4096,
            mode: 0o755,
            mod_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            link_target: String::new(),
        };
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["mtime"], "2023-11-14T22:13:20Z");
        assert_eq!(json["linkTarget"], "");
        assert!(json.get("mod_time").is_none());
    }

    #[test]
    fn test_from_top_level() {
        let mut files = FileMap::new();
        for (name, kind) in [
            ("app/", FileKind::Directory),
            ("app/main.py", FileKind::Regular),
        ] {
            files.insert(
                name.to_string(),
                FileRecord {
                    name: name.to_string(),
                    kind,
                    content: None,
                    size: 0,
                    mode: 0o755,
                    mod_time: DateTime::default(),
                    uid: 0,
                    gid: 0,
                    link_target: None,
                },
            );
        }
        assert_eq!(StatRecord::from_top_level(&files).unwrap().name, "app");

        files.remove("app/");
        assert!(StatRecord::from_top_level(&files).is_none());
    }

    #[test]
    fn test_from_record_uses_basename() {
        let record = FileRecord {
            name: "etc/nginx/".to_string(),
            kind: FileKind::Directory,
            content: None,
            size: 0,
            mode: 0o755,
            mod_time: DateTime::from_timestamp(10, 0).unwrap(),
            uid: 0,
            gid: 0,
            link_target: None,
        };
        let stat = StatRecord::from_record(&record);
        assert_eq!(stat.name, "nginx");
        assert_eq!(stat.mode, 0o755);
        assert_eq!(stat.link_target, "");
    }
}
