//! User endpoints
//!
//! Accounts are created out of band (`loopctl user add`); these routes read
//! profiles and let a user edit or delete their own account and manage
//! their favorites.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::projects::ProjectResponse;
use super::sounds::SoundResponse;
use crate::db::repos::{ProjectRepo, SoundRepo, User, UserChanges, UserProfile, UserRepo, UserSummary};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{require_owner, DisplayName, Paginated, Pagination, PaginationParams};

/// Embedded user reference (creator, member)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<UserSummary> for UserRef {
    fn from(u: UserSummary) -> Self {
        Self {
            id: u.id,
            name: u.name,
            avatar: u.avatar,
        }
    }
}

/// User response (never includes credentials)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            avatar: u.avatar,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub created_sounds: Vec<Uuid>,
    pub created_projects: Vec<Uuid>,
    pub favorite_sounds: Vec<Uuid>,
    pub favorite_projects: Vec<Uuid>,
    pub enrolled_projects: Vec<Uuid>,
}

impl From<UserProfile> for UserProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            user: p.user.into(),
            created_sounds: p.created_sound_ids,
            created_projects: p.created_project_ids,
            favorite_sounds: p.favorite_sound_ids,
            favorite_projects: p.favorite_project_ids,
            enrolled_projects: p.enrolled_project_ids,
        }
    }
}

/// Update user request; credentials are not accepted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /api/users - list users (authenticated)
async fn list_users(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let page = Pagination::from(params);
    let users = UserRepo::new(&state.pool).list(page).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let profile = UserRepo::new(&state.pool).profile(id).await?;
    Ok(Json(profile.into()))
}

/// PUT /api/users/{id} - self only
async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_owner(id, caller.id, "you can only update your own profile")?;

    let changes = UserChanges {
        name: req.name.as_deref().map(DisplayName::new).transpose()?,
        avatar: req.avatar,
    };

    let user = UserRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(user.into()))
}

/// DELETE /api/users/{id} - self only
async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_owner(id, caller.id, "you can only delete your own account")?;

    UserRepo::new(&state.pool).delete(id).await?;
    tracing::info!(user_id = %id, "deleted user");

    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}

/// GET /api/users/{id}/projects
async fn user_projects(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = ProjectRepo::new(&state.pool).list_by_creator(id).await?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// GET /api/users/{id}/sounds
async fn user_sounds(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Vec<SoundResponse>>, ApiError> {
    let sounds = SoundRepo::new(&state.pool).list_by_creator(id).await?;
    Ok(Json(sounds.into_iter().map(SoundResponse::from).collect()))
}

/// POST /api/users/{id}/favorites/sounds/{soundId}
async fn add_favorite_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, sound_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    require_owner(id, caller.id, "you can only manage your own favorites")?;

    let repo = UserRepo::new(&state.pool);
    repo.add_favorite_sound(id, sound_id).await?;
    Ok(Json(repo.profile(id).await?.into()))
}

/// DELETE /api/users/{id}/favorites/sounds/{soundId}
async fn remove_favorite_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, sound_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    require_owner(id, caller.id, "you can only manage your own favorites")?;

    let repo = UserRepo::new(&state.pool);
    repo.remove_favorite_sound(id, sound_id).await?;
    Ok(Json(repo.profile(id).await?.into()))
}

/// POST /api/users/{id}/favorites/projects/{projectId}
async fn add_favorite_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, project_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    require_owner(id, caller.id, "you can only manage your own favorites")?;

    let repo = UserRepo::new(&state.pool);
    repo.add_favorite_project(id, project_id).await?;
    Ok(Json(repo.profile(id).await?.into()))
}

/// DELETE /api/users/{id}/favorites/projects/{projectId}
async fn remove_favorite_project(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath((id, project_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    require_owner(id, caller.id, "you can only manage your own favorites")?;

    let repo = UserRepo::new(&state.pool);
    repo.remove_favorite_project(id, project_id).await?;
    Ok(Json(repo.profile(id).await?.into()))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/projects", get(user_projects))
        .route("/api/users/{id}/sounds", get(user_sounds))
        .route(
            "/api/users/{id}/favorites/sounds/{sound_id}",
            post(add_favorite_sound).delete(remove_favorite_sound),
        )
        .route(
            "/api/users/{id}/favorites/projects/{project_id}",
            post(add_favorite_project).delete(remove_favorite_project),
        )
}
