//! Project repository
//!
//! Handles project CRUD with:
//! - Atomic creation with ordered sounds and members (transaction)
//! - Forking (copy sounds, keep the parent's creator, enroll the forker)
//! - Related-project lookup by shared master sound, for lineage

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::sounds::{Sound, SoundDetail, SoundRepo};
use super::users::{UserRepo, UserSummary};
use super::{is_foreign_key_violation, violated_constraint, DbError};
use crate::models::{Description, LineageEntry, Paginated, Pagination, ProjectAccess, Title};

/// Project record from database
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub master_sound_id: Option<Uuid>,
    pub is_fork: bool,
    pub parent_project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default Postgres names of the `projects` foreign keys
const CREATOR_FK: &str = "projects_creator_id_fkey";
const PARENT_FK: &str = "projects_parent_project_id_fkey";

/// Project with its references populated
#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub project: Project,
    pub creator: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    /// In project order
    pub sounds: Vec<SoundDetail>,
    pub child_project_ids: Vec<Uuid>,
}

impl ProjectDetail {
    /// Stored master sound, else the first sound.
    pub fn master_sound_id(&self) -> Option<Uuid> {
        self.project
            .master_sound_id
            .or_else(|| self.sounds.first().map(|s| s.sound.id))
    }

    pub fn access(&self) -> ProjectAccess {
        ProjectAccess {
            creator_id: self.project.creator_id,
            member_ids: self.members.iter().map(|m| m.id).collect(),
        }
    }

    pub fn lineage_entry(&self) -> LineageEntry {
        LineageEntry {
            id: self.project.id,
            parent_id: self.project.parent_project_id,
            title: self.project.title.clone(),
            creator_name: self.creator.as_ref().map(|c| c.name.clone()),
            is_fork: self.project.is_fork,
            created_at: self.project.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: Title,
    pub description: Option<Description>,
    /// Kept in this order; duplicates are dropped
    pub sound_ids: Vec<Uuid>,
    /// The creator is never stored as a member
    pub member_ids: Vec<Uuid>,
    /// Defaults to the first sound
    pub master_sound_id: Option<Uuid>,
    pub is_fork: bool,
    pub parent_project_id: Option<Uuid>,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<Title>,
    pub description: Option<Description>,
    pub master_sound_id: Option<Uuid>,
}

/// What a client needs to fetch every audio file of a project
#[derive(Debug, Clone)]
pub struct DownloadManifest {
    pub project_id: Uuid,
    pub title: String,
    pub files: Vec<DownloadFile>,
}

#[derive(Debug, Clone)]
pub struct DownloadFile {
    pub sound_id: Uuid,
    pub title: String,
    pub url: String,
}

/// Project repository
pub struct ProjectRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a project with its sounds and members (atomic).
    pub async fn create(&self, creator_id: Uuid, new: NewProject) -> Result<ProjectDetail, DbError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = new.parent_project_id {
            let parent_exists: (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                    .bind(parent_id)
                    .fetch_one(&mut *tx)
                    .await?;

            if !parent_exists.0 {
                return Err(DbError::not_found("project", parent_id));
            }
        }

        let master_sound_id = new.master_sound_id.or_else(|| new.sound_ids.first().copied());

        let project: Project = sqlx::query_as(
            r#"
            INSERT INTO projects
                (title, description, creator_id, master_sound_id, is_fork, parent_project_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.title.as_str())
        .bind(new.description.as_ref().map(Description::as_str))
        .bind(creator_id)
        .bind(master_sound_id)
        .bind(new.is_fork)
        .bind(new.parent_project_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if !is_foreign_key_violation(&e) {
                return DbError::from(e);
            }
            match violated_constraint(&e) {
                Some(CREATOR_FK) => DbError::not_found("user", creator_id),
                Some(PARENT_FK) => DbError::not_found(
                    "project",
                    new.parent_project_id.map(|id| id.to_string()).unwrap_or_default(),
                ),
                _ => DbError::not_found(
                    "sound",
                    master_sound_id.map(|id| id.to_string()).unwrap_or_default(),
                ),
            }
        })?;

        let mut seen = HashSet::new();
        for sound_id in new.sound_ids.iter().copied().filter(|id| seen.insert(*id)) {
            append_sound(&mut *tx, project.id, sound_id).await?;
        }

        let mut enrolled = HashSet::from([creator_id]);
        for member_id in new.member_ids.iter().copied().filter(|id| enrolled.insert(*id)) {
            insert_member(&mut *tx, project.id, member_id).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            project_id = %project.id,
            is_fork = project.is_fork,
            "created project"
        );
        self.get(project.id).await
    }

    /// Fork `parent_id` on behalf of `forker`.
    ///
    /// The fork keeps the parent's creator; the forker and the parent's
    /// members become members of the fork.
    pub async fn fork(&self, parent_id: Uuid, forker: Uuid) -> Result<ProjectDetail, DbError> {
        let parent = self.get(parent_id).await?;

        let mut member_ids: Vec<Uuid> = parent.members.iter().map(|m| m.id).collect();
        if !member_ids.contains(&forker) {
            member_ids.push(forker);
        }

        let new = NewProject {
            title: Title::fork_of(&parent.project.title),
            description: Some(Description::collaboration_on(&parent.project.title)),
            sound_ids: parent.sounds.iter().map(|s| s.sound.id).collect(),
            member_ids,
            master_sound_id: parent.master_sound_id(),
            is_fork: true,
            parent_project_id: Some(parent_id),
        };

        let fork = self.create(parent.project.creator_id, new).await?;
        tracing::info!(parent = %parent_id, fork = %fork.project.id, forker = %forker, "forked project");
        Ok(fork)
    }

    /// List projects, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<ProjectDetail>, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(self.pool)
            .await?;

        let projects: Vec<Project> = sqlx::query_as(
            r#"
            SELECT p.*
            FROM projects p
            ORDER BY p.created_at DESC, p.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(page.wrap(self.hydrate(projects).await?, total))
    }

    /// Every project a user created, newest first.
    pub async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<ProjectDetail>, DbError> {
        let projects: Vec<Project> = sqlx::query_as(
            "SELECT * FROM projects WHERE creator_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(creator_id)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(projects).await
    }

    pub async fn get(&self, id: Uuid) -> Result<ProjectDetail, DbError> {
        let project: Project = sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("project", id))?;

        self.hydrate(vec![project])
            .await?
            .pop()
            .ok_or_else(|| DbError::not_found("project", id))
    }

    /// Creator and members only, for authorization before mutation.
    pub async fn access(&self, id: Uuid) -> Result<ProjectAccess, DbError> {
        let row = sqlx::query(
            r#"
            SELECT p.creator_id,
                   ARRAY(SELECT m.user_id FROM project_members m
                         WHERE m.project_id = p.id ORDER BY m.joined_at) AS member_ids
            FROM projects p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("project", id))?;

        Ok(ProjectAccess {
            creator_id: row.try_get("creator_id")?,
            member_ids: row.try_get("member_ids")?,
        })
    }

    pub async fn update(&self, id: Uuid, changes: ProjectChanges) -> Result<ProjectDetail, DbError> {
        let updated: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                master_sound_id = COALESCE($4, master_sound_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(changes.title.as_ref().map(Title::as_str))
        .bind(changes.description.as_ref().map(Description::as_str))
        .bind(changes.master_sound_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::not_found(
                    "sound",
                    changes.master_sound_id.map(|s| s.to_string()).unwrap_or_default(),
                )
            } else {
                e.into()
            }
        })?;

        if updated.is_none() {
            return Err(DbError::not_found("project", id));
        }
        self.get(id).await
    }

    /// Delete a project. Forks of it survive with their parent cleared.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("project", id));
        }
        Ok(())
    }

    /// Append a sound; the first sound added becomes the master.
    pub async fn add_sound(&self, project_id: Uuid, sound_id: Uuid) -> Result<ProjectDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        append_sound(&mut *tx, project_id, sound_id).await?;
        tx.commit().await?;
        self.get(project_id).await
    }

    pub async fn remove_sound(&self, project_id: Uuid, sound_id: Uuid) -> Result<ProjectDetail, DbError> {
        let result = sqlx::query("DELETE FROM project_sounds WHERE project_id = $1 AND sound_id = $2")
            .bind(project_id)
            .bind(sound_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("project sound", sound_id));
        }
        self.get(project_id).await
    }

    pub async fn add_member(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectDetail, DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_member(&mut *conn, project_id, user_id).await?;
        self.get(project_id).await
    }

    pub async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectDetail, DbError> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("member", user_id));
        }
        self.get(project_id).await
    }

    /// Projects whose effective master sound is `master_sound_id`, oldest first.
    ///
    /// A project with no stored master falls back to its first sound, the
    /// same rule as [`ProjectDetail::master_sound_id`].
    pub async fn related(
        &self,
        master_sound_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Vec<ProjectDetail>, DbError> {
        let projects: Vec<Project> = sqlx::query_as(
            r#"
            SELECT p.*
            FROM projects p
            WHERE COALESCE(
                    p.master_sound_id,
                    (SELECT ps.sound_id
                     FROM project_sounds ps
                     WHERE ps.project_id = p.id
                     ORDER BY ps.position, ps.added_at
                     LIMIT 1)
                  ) = $1
              AND p.id IS DISTINCT FROM $2
            ORDER BY p.created_at, p.id
            "#,
        )
        .bind(master_sound_id)
        .bind(exclude)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(projects).await
    }

    /// Sound files of a project in project order. Sounds without a URL are skipped.
    pub async fn manifest(&self, id: Uuid) -> Result<DownloadManifest, DbError> {
        let detail = self.get(id).await?;

        let files = detail
            .sounds
            .iter()
            .filter_map(|s| {
                s.sound.sound_url.as_ref().map(|url| DownloadFile {
                    sound_id: s.sound.id,
                    title: s.sound.title.clone(),
                    url: url.clone(),
                })
            })
            .collect();

        Ok(DownloadManifest {
            project_id: detail.project.id,
            title: detail.project.title,
            files,
        })
    }

    /// Populate creator, members, sounds and children for a batch of projects.
    pub async fn hydrate(&self, projects: Vec<Project>) -> Result<Vec<ProjectDetail>, DbError> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let creator_ids: Vec<Uuid> = projects
            .iter()
            .map(|p| p.creator_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let creators = UserRepo::new(self.pool).summaries(&creator_ids).await?;

        let member_rows = sqlx::query(
            r#"
            SELECT m.project_id, u.id, u.name, u.avatar
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = ANY($1)
            ORDER BY m.joined_at, u.id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<UserSummary>> = HashMap::new();
        for row in &member_rows {
            let project_id: Uuid = row.try_get("project_id")?;
            members
                .entry(project_id)
                .or_default()
                .push(UserSummary::from_row(row)?);
        }

        let sound_rows = sqlx::query(
            r#"
            SELECT ps.project_id AS owner_project_id, s.*
            FROM project_sounds ps
            JOIN sounds s ON s.id = ps.sound_id
            WHERE ps.project_id = ANY($1)
            ORDER BY ps.position, ps.added_at
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut order: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut unique: Vec<Sound> = Vec::new();
        let mut seen = HashSet::new();
        for row in &sound_rows {
            let project_id: Uuid = row.try_get("owner_project_id")?;
            let sound = Sound::from_row(row)?;
            order.entry(project_id).or_default().push(sound.id);
            if seen.insert(sound.id) {
                unique.push(sound);
            }
        }

        let sounds: HashMap<Uuid, SoundDetail> = SoundRepo::new(self.pool)
            .hydrate(unique)
            .await?
            .into_iter()
            .map(|d| (d.sound.id, d))
            .collect();

        let child_rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT parent_project_id, id
            FROM projects
            WHERE parent_project_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (parent_id, child_id) in child_rows {
            children.entry(parent_id).or_default().push(child_id);
        }

        Ok(projects
            .into_iter()
            .map(|project| ProjectDetail {
                creator: creators.get(&project.creator_id).cloned(),
                members: members.remove(&project.id).unwrap_or_default(),
                sounds: order
                    .remove(&project.id)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|id| sounds.get(id).cloned())
                    .collect(),
                child_project_ids: children.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }
}

/// Append a sound at the end of the project and make it the master if
/// the project has none.
pub(crate) async fn append_sound(
    conn: &mut PgConnection,
    project_id: Uuid,
    sound_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        INSERT INTO project_sounds (project_id, sound_id, position)
        SELECT $1, $2, COALESCE(MAX(position) + 1, 0)
        FROM project_sounds
        WHERE project_id = $1
        ON CONFLICT (project_id, sound_id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(sound_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            DbError::not_found("project or sound", format!("{project_id}/{sound_id}"))
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(DbError::duplicate("project sound", sound_id));
    }

    sqlx::query(
        r#"
        UPDATE projects
        SET master_sound_id = $2, updated_at = NOW()
        WHERE id = $1 AND master_sound_id IS NULL
        "#,
    )
    .bind(project_id)
    .bind(sound_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_member(
    conn: &mut PgConnection,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (project_id, user_id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            DbError::not_found("user", user_id)
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(DbError::duplicate("member", user_id));
    }
    Ok(())
}
