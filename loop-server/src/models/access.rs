//! Ownership and membership checks.
//!
//! Every mutating route compares the caller's id against the owning
//! document's creator (and, for projects, members) before touching the
//! database. These are pure functions so the rules can be tested without
//! a pool.

use std::fmt;

use uuid::Uuid;

/// Caller is authenticated but not allowed to perform the action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub reason: &'static str,
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)
    }
}

impl std::error::Error for AccessDenied {}

/// Who owns and who may edit a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAccess {
    pub creator_id: Uuid,
    pub member_ids: Vec<Uuid>,
}

impl ProjectAccess {
    pub fn is_creator(&self, user: Uuid) -> bool {
        self.creator_id == user
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.member_ids.contains(&user)
    }

    /// Creator or member
    pub fn is_collaborator(&self, user: Uuid) -> bool {
        self.is_creator(user) || self.is_member(user)
    }

    pub fn require_creator(&self, user: Uuid, reason: &'static str) -> Result<(), AccessDenied> {
        if self.is_creator(user) {
            Ok(())
        } else {
            Err(AccessDenied { reason })
        }
    }

    pub fn require_collaborator(
        &self,
        user: Uuid,
        reason: &'static str,
    ) -> Result<(), AccessDenied> {
        if self.is_collaborator(user) {
            Ok(())
        } else {
            Err(AccessDenied { reason })
        }
    }
}

/// Single-owner resources (sounds, user profiles).
pub fn require_owner(owner: Uuid, user: Uuid, reason: &'static str) -> Result<(), AccessDenied> {
    if owner == user {
        Ok(())
    } else {
        Err(AccessDenied { reason })
    }
}
