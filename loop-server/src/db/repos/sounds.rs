//! Sound repository
//!
//! Handles sound CRUD with:
//! - Atomic creation with tags and optional project attachment (transaction)
//! - Batch population of creator, tags and containing projects

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::projects::append_sound;
use super::tags::{link_tags, Tag};
use super::users::{UserRepo, UserSummary};
use super::{is_foreign_key_violation, DbError};
use crate::models::{Bpm, Description, Duration, Paginated, Pagination, TagName, Title};

/// Sound record from database
#[derive(Debug, Clone, FromRow)]
pub struct Sound {
    pub id: Uuid,
    pub title: String,
    pub bpm: i32,
    pub duration: Option<f64>,
    pub description: Option<String>,
    pub sound_url: Option<String>,
    pub is_master_sound: bool,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sound with its references populated
#[derive(Debug, Clone)]
pub struct SoundDetail {
    pub sound: Sound,
    /// `None` only if the creator row vanished mid-request
    pub creator: Option<UserSummary>,
    pub tags: Vec<Tag>,
    pub project_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewSound {
    pub title: Title,
    pub bpm: Bpm,
    pub duration: Option<Duration>,
    pub description: Option<Description>,
    pub sound_url: Option<String>,
    pub is_master_sound: bool,
    pub tags: Vec<TagName>,
    /// Project to append the sound to
    pub project_id: Option<Uuid>,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct SoundChanges {
    pub title: Option<Title>,
    pub bpm: Option<Bpm>,
    pub duration: Option<Duration>,
    pub description: Option<Description>,
    pub sound_url: Option<String>,
    pub is_master_sound: Option<bool>,
    /// Replaces the whole tag set when present
    pub tags: Option<Vec<TagName>>,
}

/// Sound repository
pub struct SoundRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SoundRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a sound, link its tags and optionally append it to a project.
    ///
    /// The caller has already checked project membership. All writes share
    /// one transaction.
    pub async fn create(&self, creator_id: Uuid, new: NewSound) -> Result<SoundDetail, DbError> {
        let mut tx = self.pool.begin().await?;

        let sound: Sound = sqlx::query_as(
            r#"
            INSERT INTO sounds
                (title, bpm, duration, description, sound_url, is_master_sound, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.title.as_str())
        .bind(new.bpm.get())
        .bind(new.duration.map(Duration::seconds))
        .bind(new.description.as_ref().map(Description::as_str))
        .bind(new.sound_url.as_deref())
        .bind(new.is_master_sound)
        .bind(creator_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::not_found("user", creator_id)
            } else {
                e.into()
            }
        })?;

        link_tags(&mut *tx, sound.id, &new.tags).await?;

        if let Some(project_id) = new.project_id {
            append_sound(&mut *tx, project_id, sound.id).await?;
        }

        tx.commit().await?;

        tracing::debug!(sound_id = %sound.id, creator_id = %creator_id, "created sound");
        self.get(sound.id).await
    }

    /// List sounds, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<SoundDetail>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sounds")
            .fetch_one(self.pool)
            .await?;

        let sounds: Vec<Sound> = sqlx::query_as(
            r#"
            SELECT s.*
            FROM sounds s
            ORDER BY s.created_at DESC, s.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(page.wrap(self.hydrate(sounds).await?, total))
    }

    /// Every sound a user created, newest first.
    pub async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<SoundDetail>, DbError> {
        let sounds: Vec<Sound> = sqlx::query_as(
            "SELECT * FROM sounds WHERE creator_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(creator_id)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(sounds).await
    }

    pub async fn get(&self, id: Uuid) -> Result<SoundDetail, DbError> {
        let sound: Sound = sqlx::query_as("SELECT * FROM sounds WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("sound", id))?;

        self.hydrate(vec![sound])
            .await?
            .pop()
            .ok_or_else(|| DbError::not_found("sound", id))
    }

    /// Owner of a sound, for authorization before mutation.
    pub async fn creator_of(&self, id: Uuid) -> Result<Uuid, DbError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT creator_id FROM sounds WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(|(creator,)| creator)
            .ok_or_else(|| DbError::not_found("sound", id))
    }

    pub async fn update(&self, id: Uuid, changes: SoundChanges) -> Result<SoundDetail, DbError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE sounds
            SET title = COALESCE($2, title),
                bpm = COALESCE($3, bpm),
                duration = COALESCE($4, duration),
                description = COALESCE($5, description),
                sound_url = COALESCE($6, sound_url),
                is_master_sound = COALESCE($7, is_master_sound),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(changes.title.as_ref().map(Title::as_str))
        .bind(changes.bpm.map(Bpm::get))
        .bind(changes.duration.map(Duration::seconds))
        .bind(changes.description.as_ref().map(Description::as_str))
        .bind(changes.sound_url.as_deref())
        .bind(changes.is_master_sound)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Err(DbError::not_found("sound", id));
        }

        if let Some(tags) = &changes.tags {
            sqlx::query("DELETE FROM sound_tags WHERE sound_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_tags(&mut *tx, id, tags).await?;
        }

        tx.commit().await?;
        self.get(id).await
    }

    /// Delete a sound. It drops out of every project that used it.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM sounds WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("sound", id));
        }
        Ok(())
    }

    /// Populate creator, tags and containing projects for a batch of sounds.
    ///
    /// Three queries regardless of batch size. Order of `sounds` is kept.
    pub async fn hydrate(&self, sounds: Vec<Sound>) -> Result<Vec<SoundDetail>, DbError> {
        if sounds.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = sounds.iter().map(|s| s.id).collect();
        let creator_ids: Vec<Uuid> = sounds
            .iter()
            .map(|s| s.creator_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let creators = UserRepo::new(self.pool).summaries(&creator_ids).await?;

        let tag_rows = sqlx::query(
            r#"
            SELECT st.sound_id, t.id, t.name, t.created_at
            FROM sound_tags st
            JOIN tags t ON t.id = st.tag_id
            WHERE st.sound_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in &tag_rows {
            let sound_id: Uuid = row.try_get("sound_id")?;
            tags.entry(sound_id).or_default().push(Tag::from_row(row)?);
        }

        let project_rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT sound_id, project_id
            FROM project_sounds
            WHERE sound_id = ANY($1)
            ORDER BY added_at
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut projects: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (sound_id, project_id) in project_rows {
            projects.entry(sound_id).or_default().push(project_id);
        }

        Ok(sounds
            .into_iter()
            .map(|sound| SoundDetail {
                creator: creators.get(&sound.creator_id).cloned(),
                tags: tags.remove(&sound.id).unwrap_or_default(),
                project_ids: projects.remove(&sound.id).unwrap_or_default(),
                sound,
            })
            .collect())
    }
}
