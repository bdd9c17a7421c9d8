//! Title and free-text validation for sounds and projects

use super::ValidationError;

/// Maximum length for sound/project titles
const MAX_TITLE_LEN: usize = 256;

/// Maximum length for descriptions
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Validated title shared by sounds and projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title(String);

impl Title {
    /// Create a new title.
    ///
    /// # Rules
    /// - Non-empty (after trimming whitespace)
    /// - Max 256 characters
    ///
    /// # Example
    /// ```
    /// use loop_server::models::Title;
    ///
    /// assert!(Title::new("Late night loop").is_ok());
    /// assert!(Title::new("").is_err());
    /// assert!(Title::new("   ").is_err());  // whitespace only
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if trimmed.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Title for a fork of `parent`, truncated to fit.
    pub fn fork_of(parent: &str) -> Self {
        let full = format!("My version of {}", parent.trim());
        Self(full.chars().take(MAX_TITLE_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optional free-text description.
///
/// Blank input collapses to `None` so the column stays NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description(String);

impl Description {
    pub fn parse(s: Option<&str>) -> Result<Option<Self>, ValidationError> {
        let Some(trimmed) = s.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::TooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN,
            });
        }

        Ok(Some(Self(trimmed.to_owned())))
    }

    /// Description given to a fork of `parent`.
    pub fn collaboration_on(parent: &str) -> Self {
        let full = format!("Collaboration on {}", parent.trim());
        Self(full.chars().take(MAX_DESCRIPTION_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
