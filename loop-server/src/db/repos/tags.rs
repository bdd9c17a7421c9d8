//! Tag repository
//!
//! Tags are created implicitly when a sound names them, or explicitly
//! through the tag routes. Names are unique.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::sounds::{Sound, SoundDetail, SoundRepo};
use super::{is_unique_violation, DbError};
use crate::models::{Paginated, Pagination, TagName};

/// Tag record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Tag with usage count for list display
#[derive(Debug, Clone)]
pub struct TagWithCount {
    pub tag: Tag,
    pub sound_count: i64,
}

#[derive(Debug, Clone)]
pub struct TagWithSounds {
    pub tag: Tag,
    pub sounds: Vec<SoundDetail>,
}

/// Tag repository
pub struct TagRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TagRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &TagName) -> Result<Tag, DbError> {
        sqlx::query_as("INSERT INTO tags (name) VALUES ($1) RETURNING id, name, created_at")
            .bind(name.as_str())
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::duplicate("tag", name.as_str())
                } else {
                    e.into()
                }
            })
    }

    /// List tags alphabetically with how many sounds use each.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<TagWithCount>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.name,
                t.created_at,
                COUNT(st.sound_id) AS sound_count
            FROM tags t
            LEFT JOIN sound_tags st ON st.tag_id = t.id
            GROUP BY t.id, t.name, t.created_at
            ORDER BY t.name
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(self.pool)
            .await?;

        let tags = rows
            .iter()
            .map(|row| {
                Ok(TagWithCount {
                    tag: Tag::from_row(row)?,
                    sound_count: row.try_get("sound_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(page.wrap(tags, total))
    }

    /// A tag with every sound carrying it, newest first.
    pub async fn get(&self, id: Uuid) -> Result<TagWithSounds, DbError> {
        let tag: Tag = sqlx::query_as("SELECT id, name, created_at FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("tag", id))?;

        let sounds: Vec<Sound> = sqlx::query_as(
            r#"
            SELECT s.*
            FROM sound_tags st
            JOIN sounds s ON s.id = st.sound_id
            WHERE st.tag_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let sounds = SoundRepo::new(self.pool).hydrate(sounds).await?;
        Ok(TagWithSounds { tag, sounds })
    }

    pub async fn rename(&self, id: Uuid, name: &TagName) -> Result<Tag, DbError> {
        sqlx::query_as(
            "UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::duplicate("tag", name.as_str())
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| DbError::not_found("tag", id))
    }

    /// Delete a tag; sounds lose the association.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tag", id));
        }
        Ok(())
    }
}

/// Upsert each tag by name and link it to the sound.
pub(crate) async fn link_tags(
    conn: &mut PgConnection,
    sound_id: Uuid,
    tags: &[TagName],
) -> Result<(), DbError> {
    for tag in tags {
        sqlx::query(
            r#"
            WITH upserted AS (
                INSERT INTO tags (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
            )
            INSERT INTO sound_tags (sound_id, tag_id)
            SELECT $2, id FROM upserted
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tag.as_str())
        .bind(sound_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
