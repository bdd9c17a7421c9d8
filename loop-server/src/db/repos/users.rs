//! User repository
//!
//! Profiles carry the id arrays a client needs to render a user page:
//! created sounds and projects, favorites, and projects the user was
//! enrolled in as a member.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::{is_foreign_key_violation, is_unique_violation, DbError};
use crate::models::{DisplayName, Email, Paginated, Pagination};

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public fields embedded wherever a user is referenced
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub created_sound_ids: Vec<Uuid>,
    pub created_project_ids: Vec<Uuid>,
    pub favorite_sound_ids: Vec<Uuid>,
    pub favorite_project_ids: Vec<Uuid>,
    pub enrolled_project_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: DisplayName,
    pub avatar: Option<String>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<DisplayName>,
    pub avatar: Option<String>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        sqlx::query_as(
            r#"
            INSERT INTO users (email, name, avatar)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, avatar, created_at, updated_at
            "#,
        )
        .bind(new.email.as_str())
        .bind(new.name.as_str())
        .bind(new.avatar.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::duplicate("user", new.email.as_str())
            } else {
                e.into()
            }
        })
    }

    /// List users, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<User>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        let users: Vec<User> = sqlx::query_as(
            r#"
            SELECT id, email, name, avatar, created_at, updated_at
            FROM users
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(page.wrap(users, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        sqlx::query_as(
            "SELECT id, email, name, avatar, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DbError> {
        Ok(sqlx::query_as(
            "SELECT id, email, name, avatar, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?)
    }

    /// User plus the id arrays of everything they created, favorited or joined.
    pub async fn profile(&self, id: Uuid) -> Result<UserProfile, DbError> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name, u.avatar, u.created_at, u.updated_at,
                ARRAY(SELECT s.id FROM sounds s
                      WHERE s.creator_id = u.id ORDER BY s.created_at) AS created_sound_ids,
                ARRAY(SELECT p.id FROM projects p
                      WHERE p.creator_id = u.id ORDER BY p.created_at) AS created_project_ids,
                ARRAY(SELECT f.sound_id FROM favorite_sounds f
                      WHERE f.user_id = u.id ORDER BY f.created_at) AS favorite_sound_ids,
                ARRAY(SELECT f.project_id FROM favorite_projects f
                      WHERE f.user_id = u.id ORDER BY f.created_at) AS favorite_project_ids,
                ARRAY(SELECT m.project_id FROM project_members m
                      WHERE m.user_id = u.id ORDER BY m.joined_at) AS enrolled_project_ids
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(UserProfile {
            user: User::from_row(&row)?,
            created_sound_ids: row.try_get("created_sound_ids")?,
            created_project_ids: row.try_get("created_project_ids")?,
            favorite_sound_ids: row.try_get("favorite_sound_ids")?,
            favorite_project_ids: row.try_get("favorite_project_ids")?,
            enrolled_project_ids: row.try_get("enrolled_project_ids")?,
        })
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DbError> {
        sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                avatar = COALESCE($3, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, avatar, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_ref().map(DisplayName::as_str))
        .bind(changes.avatar.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Delete a user. Their sounds and projects go with them.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    /// Summaries for a batch of ids. Unknown ids are absent from the map.
    pub async fn summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>, DbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<UserSummary> =
            sqlx::query_as("SELECT id, name, avatar FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(|u| (u.id, u)).collect())
    }

    pub async fn add_favorite_sound(&self, user_id: Uuid, sound_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO favorite_sounds (user_id, sound_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, sound_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(sound_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::not_found("sound", sound_id)
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::duplicate("favorite sound", sound_id));
        }
        Ok(())
    }

    pub async fn remove_favorite_sound(&self, user_id: Uuid, sound_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM favorite_sounds WHERE user_id = $1 AND sound_id = $2")
            .bind(user_id)
            .bind(sound_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("favorite sound", sound_id));
        }
        Ok(())
    }

    pub async fn add_favorite_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO favorite_projects (user_id, project_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, project_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::not_found("project", project_id)
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::duplicate("favorite project", project_id));
        }
        Ok(())
    }

    pub async fn remove_favorite_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<(), DbError> {
        let result =
            sqlx::query("DELETE FROM favorite_projects WHERE user_id = $1 AND project_id = $2")
                .bind(user_id)
                .bind(project_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("favorite project", project_id));
        }
        Ok(())
    }
}
