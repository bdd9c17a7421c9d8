//! User identity validation (email and display name)

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// RFC 5321 path limit
const MAX_EMAIL_LEN: usize = 254;

const MAX_NAME_LEN: usize = 128;

/// Deliberately loose: one `@`, no whitespace, a dot in the domain.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

/// Validated, normalized (trimmed + lowercased) email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// # Example
    /// ```
    /// use loop_server::models::Email;
    ///
    /// assert_eq!(Email::new(" Ana@Example.COM ").unwrap().as_str(), "ana@example.com");
    /// assert!(Email::new("not-an-email").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }

        if normalized.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        if !EMAIL_RE.is_match(&normalized) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must look like name@domain.tld",
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalizes() {
        let email = Email::new("  DJ@Loop.Audio ").unwrap();
        assert_eq!(email.as_str(), "dj@loop.audio");
    }

    #[test]
    fn email_rejects_bad_shapes() {
        assert!(matches!(Email::new("").unwrap_err(), ValidationError::Empty { .. }));
        assert!(Email::new("no-at-sign").is_err());
        assert!(Email::new("two@@signs.com").is_err());
        assert!(Email::new("space in@name.com").is_err());
        assert!(Email::new("nodot@domain").is_err());
    }

    #[test]
    fn display_name_rules() {
        assert_eq!(DisplayName::new(" Ana ").unwrap().as_str(), "Ana");
        assert!(DisplayName::new("  ").is_err());
        assert!(matches!(
            DisplayName::new(&"n".repeat(129)).unwrap_err(),
            ValidationError::TooLong { max: 128, .. }
        ));
    }
}
