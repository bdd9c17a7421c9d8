//! Project endpoints
//!
//! Creation, collaboration (sounds, members), forking and lineage.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sounds::SoundResponse;
use super::users::{MessageResponse, UserRef};
use crate::db::repos::{
    DbError, DownloadManifest, NewProject, ProjectChanges, ProjectDetail, ProjectRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{
    build_family_tree, Description, FamilyTree, Paginated, Pagination, PaginationParams, Title,
    ValidationError,
};

/// Project response with creator, members and sounds populated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator: Option<UserRef>,
    pub members: Vec<UserRef>,
    pub sounds: Vec<SoundResponse>,
    pub master_sound_id: Option<Uuid>,
    pub is_fork: bool,
    pub parent_project_id: Option<Uuid>,
    pub child_project_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectDetail> for ProjectResponse {
    fn from(d: ProjectDetail) -> Self {
        let master_sound_id = d.master_sound_id();
        Self {
            id: d.project.id,
            title: d.project.title,
            description: d.project.description,
            creator: d.creator.map(UserRef::from),
            members: d.members.into_iter().map(UserRef::from).collect(),
            sounds: d.sounds.into_iter().map(SoundResponse::from).collect(),
            master_sound_id,
            is_fork: d.project.is_fork,
            parent_project_id: d.project.parent_project_id,
            child_project_ids: d.child_project_ids,
            created_at: d.project.created_at,
            updated_at: d.project.updated_at,
        }
    }
}

/// Create project request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default, alias = "sounds")]
    pub sound_ids: Vec<Uuid>,
    #[serde(default)]
    pub members: Vec<Uuid>,
    pub master_sound_id: Option<Uuid>,
    #[serde(default)]
    pub is_fork: bool,
    pub parent_project_id: Option<Uuid>,
}

impl CreateProjectRequest {
    fn validate(self) -> Result<NewProject, ValidationError> {
        Ok(NewProject {
            title: Title::new(&self.title)?,
            description: Description::parse(self.description.as_deref())?,
            sound_ids: self.sound_ids,
            member_ids: self.members,
            master_sound_id: self.master_sound_id,
            is_fork: self.is_fork,
            parent_project_id: self.parent_project_id,
        })
    }
}

/// Update project request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub master_sound_id: Option<Uuid>,
}

impl UpdateProjectRequest {
    fn validate(self) -> Result<ProjectChanges, ValidationError> {
        Ok(ProjectChanges {
            title: self.title.as_deref().map(Title::new).transpose()?,
            description: Description::parse(self.description.as_deref())?,
            master_sound_id: self.master_sound_id,
        })
    }
}

/// `?projectId=`; kept as text so a bad id degrades instead of failing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedParams {
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExcludeParams {
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    pub project_id: Uuid,
    pub title: String,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    pub sound_id: Uuid,
    pub title: String,
    pub url: String,
}

impl From<DownloadManifest> for ManifestResponse {
    fn from(m: DownloadManifest) -> Self {
        Self {
            project_id: m.project_id,
            title: m.title,
            files: m
                .files
                .into_iter()
                .map(|f| ManifestFile {
                    sound_id: f.sound_id,
                    title: f.title,
                    url: f.url,
                })
                .collect(),
        }
    }
}

fn to_responses(projects: Vec<ProjectDetail>) -> Vec<ProjectResponse> {
    projects.into_iter().map(ProjectResponse::from).collect()
}

/// GET /api/projects - list projects with pagination
async fn list_projects(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<ProjectResponse>>, ApiError> {
    let page = Pagination::from(params);
    let projects = ProjectRepo::new(&state.pool).list(page).await?;
    Ok(Json(projects.map(ProjectResponse::from)))
}

/// POST /api/projects - create a project owned by the caller
async fn create_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidJson(req): ValidJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let new = req.validate()?;
    let project = ProjectRepo::new(&state.pool).create(caller.id, new).await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

/// GET /api/projects/{id}
async fn get_project(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = ProjectRepo::new(&state.pool).get(id).await?;
    Ok(Json(project.into()))
}

/// PUT /api/projects/{id} - creator or member
async fn update_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let changes = req.validate()?;
    let repo = ProjectRepo::new(&state.pool);

    repo.access(id)
        .await?
        .require_collaborator(caller.id, "only project collaborators can edit this project")?;

    let project = repo.update(id, changes).await?;
    Ok(Json(project.into()))
}

/// DELETE /api/projects/{id} - creator only
async fn delete_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);

    repo.access(id)
        .await?
        .require_creator(caller.id, "only the creator can delete this project")?;

    repo.delete(id).await?;
    tracing::info!(project_id = %id, "deleted project");

    Ok(Json(MessageResponse {
        message: "Project deleted successfully",
    }))
}

/// POST /api/projects/{id}/fork
async fn fork_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let fork = ProjectRepo::new(&state.pool).fork(id, caller.id).await?;
    Ok((StatusCode::CREATED, Json(fork.into())))
}

/// GET /api/projects/{id}/tree - fork lineage around the project
async fn project_tree(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<FamilyTree>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);
    let current = repo.get(id).await?;

    let related = match current.master_sound_id() {
        Some(master) => repo.related(master, Some(id)).await?,
        None => Vec::new(),
    };

    let tree = build_family_tree(
        current.lineage_entry(),
        related.iter().map(ProjectDetail::lineage_entry).collect(),
    );

    if !tree.detached.is_empty() {
        tracing::debug!(
            project_id = %id,
            detached = tree.detached.len(),
            "lineage has projects not reachable from the root"
        );
    }

    Ok(Json(tree))
}

/// GET /api/projects/related?projectId= - projects sharing a master sound
///
/// Never fails: lookup problems are logged and answered with `[]`.
async fn related_projects(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<RelatedParams>,
) -> Json<Vec<ProjectResponse>> {
    let Some(raw) = params.project_id.filter(|p| !p.trim().is_empty()) else {
        tracing::warn!("related projects requested without projectId");
        return Json(Vec::new());
    };

    let Ok(project_id) = Uuid::parse_str(raw.trim()) else {
        tracing::warn!(project_id = %raw, "related projects requested with invalid projectId");
        return Json(Vec::new());
    };

    match related_to_project(&state, project_id).await {
        Ok(projects) => Json(to_responses(projects)),
        Err(e) => {
            tracing::warn!(project_id = %project_id, error = %e, "related project lookup failed");
            Json(Vec::new())
        }
    }
}

async fn related_to_project(
    state: &AppState,
    project_id: Uuid,
) -> Result<Vec<ProjectDetail>, DbError> {
    let repo = ProjectRepo::new(&state.pool);
    let project = repo.get(project_id).await?;

    match project.master_sound_id() {
        Some(master) => repo.related(master, Some(project_id)).await,
        None => Ok(Vec::new()),
    }
}

/// GET /api/projects/related/{masterSoundId}?exclude=
async fn related_by_master(
    State(state): State<Arc<AppState>>,
    ValidPath(master_sound_id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<ExcludeParams>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = ProjectRepo::new(&state.pool)
        .related(master_sound_id, params.exclude)
        .await?;
    Ok(Json(to_responses(projects)))
}

/// GET /api/projects/download-project/{id} - download manifest
async fn download_project(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<ManifestResponse>, ApiError> {
    let manifest = ProjectRepo::new(&state.pool).manifest(id).await?;
    Ok(Json(manifest.into()))
}

/// POST /api/projects/{id}/sounds/{soundId} - creator or member
async fn add_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, sound_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);

    repo.access(id)
        .await?
        .require_collaborator(caller.id, "only project collaborators can add sounds")?;

    let project = repo.add_sound(id, sound_id).await?;
    Ok(Json(project.into()))
}

/// DELETE /api/projects/{id}/sounds/{soundId} - creator or member
async fn remove_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, sound_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);

    repo.access(id)
        .await?
        .require_collaborator(caller.id, "only project collaborators can remove sounds")?;

    let project = repo.remove_sound(id, sound_id).await?;
    Ok(Json(project.into()))
}

/// POST /api/projects/{id}/members/{userId} - creator only
async fn add_member(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, user_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);
    let access = repo.access(id).await?;

    access.require_creator(caller.id, "only the creator can add members")?;
    if access.is_creator(user_id) {
        return Err(DbError::duplicate("member", user_id).into());
    }

    let project = repo.add_member(id, user_id).await?;
    Ok(Json(project.into()))
}

/// DELETE /api/projects/{id}/members/{userId} - creator only
async fn remove_member(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, user_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let repo = ProjectRepo::new(&state.pool);

    repo.access(id)
        .await?
        .require_creator(caller.id, "only the creator can remove members")?;

    let project = repo.remove_member(id, user_id).await?;
    Ok(Json(project.into()))
}

/// Project routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/related", get(related_projects))
        .route(
            "/api/projects/related/{master_sound_id}",
            get(related_by_master),
        )
        .route(
            "/api/projects/download-project/{id}",
            get(download_project),
        )
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/fork", post(fork_project))
        .route("/api/projects/{id}/tree", get(project_tree))
        .route(
            "/api/projects/{id}/sounds/{sound_id}",
            post(add_sound).delete(remove_sound),
        )
        .route(
            "/api/projects/{id}/members/{user_id}",
            post(add_member).delete(remove_member),
        )
}
