use std::fmt;

use crate::error::ValidationError;

/// Validate a container name against the runtime's naming grammar.
///
/// The first character must be an ASCII letter or digit; every following
/// character must be an ASCII letter, digit, `_`, `.` or `-`.
pub fn validate_container_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(ValidationError::EmptyIdentifier)?;

    if !first.is_ascii_alphanumeric() {
        return Err(ValidationError::InvalidFormat(name.to_string()));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-') {
        return Err(ValidationError::InvalidFormat(name.to_string()));
    }

    Ok(())
}

/// A container name that passed [`validate_container_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    /// Validate and wrap a container name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyIdentifier`] or
    /// [`ValidationError::InvalidFormat`].
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_container_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContainerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["my-app_1.0", "a", "9", "web", "Web.Server-2", "abc123def456"] {
            assert!(validate_container_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(
            validate_container_name(""),
            Err(ValidationError::EmptyIdentifier)
        );
    }

    #[test]
    fn test_bad_first_character() {
        for name in [".hidden", "-x", "_x", "/web"] {
            assert_eq!(
                validate_container_name(name),
                Err(ValidationError::InvalidFormat(name.to_string())),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_later_character() {
        for name in ["my container", "web!", "a/b", "a:b", "caf\u{e9}"] {
            assert!(
                matches!(
                    validate_container_name(name),
                    Err(ValidationError::InvalidFormat(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_ascii_first_character() {
        assert!(validate_container_name("\u{e9}tude").is_err());
    }

    #[test]
    fn test_container_name_wraps() {
        let name = ContainerName::new("web-1").expect("valid name");
        assert_eq!(name.as_str(), "web-1");
        assert_eq!(name.to_string(), "web-1");
        assert!(ContainerName::new("").is_err());
    }
}
