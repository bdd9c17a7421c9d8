//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Batch-loads referenced rows with `= ANY($1)` (no N+1)
//! - Maps unique/foreign-key violations to `DbError` (no check-then-insert)
//! - Uses transactions for multi-step operations

pub mod projects;
pub mod sounds;
pub mod tags;
pub mod users;

pub use projects::{DownloadFile, DownloadManifest, NewProject, Project, ProjectChanges, ProjectDetail, ProjectRepo};
pub use sounds::{NewSound, Sound, SoundChanges, SoundDetail, SoundRepo};
pub use tags::{Tag, TagRepo, TagWithCount, TagWithSounds};
pub use users::{NewUser, User, UserChanges, UserProfile, UserRepo, UserSummary};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} '{id}' already exists")]
    Duplicate { resource: &'static str, id: String },
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn duplicate(resource: &'static str, id: impl ToString) -> Self {
        Self::Duplicate {
            resource,
            id: id.to_string(),
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Name of the constraint a database error violated, if any
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}
