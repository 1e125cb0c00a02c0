use std::fmt;

use crate::error::ValidationError;

/// A path inside a container, normalized and relative to the container root.
///
/// Normalization drops empty and `.` segments. Any `..` segment is rejected
/// outright rather than resolved: a relative path that needs `..` to name its
/// target is not a strict descendant of the root it was requested under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerPath {
    /// Path segments (e.g., ["etc", "nginx", "nginx.conf"])
    segments: Vec<String>,
}

impl ContainerPath {
    /// Normalize and validate a requested path.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if path.contains('\0') {
            return Err(ValidationError::NulByte(path.to_string()));
        }

        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(ValidationError::PathTraversal(path.to_string())),
                _ => segments.push(segment.to_string()),
            }
        }

        Ok(ContainerPath { segments })
    }

    /// Relative form handed to the runtime; the root is `"."`.
    pub fn as_relative(&self) -> String {
        if self.segments.is_empty() {
            ".".to_string()
        } else {
            self.segments.join("/")
        }
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_relative())
    }
}

/// Clean a requested path and reject traversal attempts.
///
/// The result is always relative: a single leading `/` disappears along with
/// redundant separators and `.` segments.
pub fn sanitize_path(path: &str) -> Result<String, ValidationError> {
    ContainerPath::parse(path).map(|p| p.as_relative())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_relative_unchanged() {
        assert_eq!(sanitize_path("a/b/c").unwrap(), "a/b/c");
    }

    #[test]
    fn test_leading_separator_stripped() {
        assert_eq!(sanitize_path("/etc/hosts").unwrap(), "etc/hosts");
        assert_eq!(sanitize_path("//etc/hosts").unwrap(), "etc/hosts");
    }

    #[test]
    fn test_redundant_segments_removed() {
        assert_eq!(sanitize_path("a//b/./c/").unwrap(), "a/b/c");
        assert_eq!(sanitize_path("./a").unwrap(), "a");
    }

    #[test]
    fn test_root_forms() {
        assert_eq!(sanitize_path("/").unwrap(), ".");
        assert_eq!(sanitize_path(".").unwrap(), ".");
        assert_eq!(sanitize_path("/./").unwrap(), ".");
        assert_eq!(ContainerPath::parse("/").unwrap().to_string(), ".");
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(sanitize_path(""), Err(ValidationError::EmptyPath));
    }

    #[test]
    fn test_traversal_rejected() {
        for path in [
            "..",
            "../etc/passwd",
            "a/../b",
            "a/b/../../..",
            "/../etc/shadow",
            "a/./../b",
            "a/b/..",
            "./..",
        ] {
            assert_eq!(
                sanitize_path(path),
                Err(ValidationError::PathTraversal(path.to_string())),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_dotted_names_accepted() {
        assert_eq!(sanitize_path("a..b").unwrap(), "a..b");
        assert_eq!(sanitize_path("...").unwrap(), "...");
        assert_eq!(sanitize_path("..hidden/x").unwrap(), "..hidden/x");
        assert_eq!(sanitize_path("file..").unwrap(), "file..");
        assert_eq!(sanitize_path(".env").unwrap(), ".env");
    }

    #[test]
    fn test_nul_rejected() {
        assert!(matches!(
            sanitize_path("etc/pass\0wd"),
            Err(ValidationError::NulByte(_))
        ));
    }

    #[test]
    fn test_backslash_is_not_a_separator() {
        // Container paths are POSIX; a backslash is part of the name.
        assert_eq!(sanitize_path("a\\..\\b").unwrap(), "a\\..\\b");
    }

    #[test]
    fn test_display_is_relative() {
        let path = ContainerPath::parse("/var/log/app.log").unwrap();
        assert_eq!(path.to_string(), "var/log/app.log");
        assert_eq!(path, ContainerPath::parse("var//log/./app.log").unwrap());
    }
}
