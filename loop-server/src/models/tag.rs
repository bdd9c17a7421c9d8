//! Tag name validation

use super::ValidationError;

/// Maximum length for tag names
const MAX_TAG_NAME_LEN: usize = 64;

/// Validated tag name. Uniqueness is enforced by the `tags.name` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName(String);

impl TagName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "tag name" });
        }

        if trimmed.chars().count() > MAX_TAG_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "tag name",
                max: MAX_TAG_NAME_LEN,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFormat {
                field: "tag name",
                reason: "must not contain control characters",
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Validate a list of names, dropping repeats while keeping first-seen order.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, ValidationError> {
        let mut out: Vec<Self> = Vec::with_capacity(names.len());
        for name in names {
            let tag = Self::new(name.as_ref())?;
            if !out.contains(&tag) {
                out.push(tag);
            }
        }
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
