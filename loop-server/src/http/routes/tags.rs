//! Tag endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sounds::SoundResponse;
use super::users::MessageResponse;
use crate::db::repos::{Tag, TagRepo, TagWithCount, TagWithSounds};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams, TagName};

/// Tag embedded in a sound
#[derive(Debug, Serialize)]
pub struct TagRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagRef {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

/// Tag response for list display
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub sound_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TagWithCount> for TagResponse {
    fn from(t: TagWithCount) -> Self {
        Self {
            id: t.tag.id,
            name: t.tag.name,
            sound_count: t.sound_count,
            created_at: t.tag.created_at,
        }
    }
}

impl From<Tag> for TagResponse {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
            sound_count: 0,
            created_at: t.created_at,
        }
    }
}

/// Tag with its sounds populated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDetailResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub sounds: Vec<SoundResponse>,
}

impl From<TagWithSounds> for TagDetailResponse {
    fn from(t: TagWithSounds) -> Self {
        Self {
            id: t.tag.id,
            name: t.tag.name,
            created_at: t.tag.created_at,
            sounds: t.sounds.into_iter().map(SoundResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

/// GET /api/tags - list tags with sound counts
async fn list_tags(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<TagResponse>>, ApiError> {
    let page = Pagination::from(params);
    let tags = TagRepo::new(&state.pool).list(page).await?;
    Ok(Json(tags.map(TagResponse::from)))
}

/// POST /api/tags
async fn create_tag(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    ValidJson(req): ValidJson<TagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let name = TagName::new(&req.name)?;
    let tag = TagRepo::new(&state.pool).create(&name).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// GET /api/tags/{id} - tag with its sounds
async fn get_tag(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<TagDetailResponse>, ApiError> {
    let tag = TagRepo::new(&state.pool).get(id).await?;
    Ok(Json(tag.into()))
}

/// PUT /api/tags/{id} - rename
async fn rename_tag(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<TagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let name = TagName::new(&req.name)?;
    let tag = TagRepo::new(&state.pool).rename(id, &name).await?;
    Ok(Json(tag.into()))
}

/// DELETE /api/tags/{id}
async fn delete_tag(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    TagRepo::new(&state.pool).delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Tag deleted successfully",
    }))
}

/// Tag routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route(
            "/api/tags/{id}",
            get(get_tag).put(rename_tag).delete(delete_tag),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_item_serializes_count() {
        let tag = TagWithCount {
            tag: Tag {
                id: Uuid::nil(),
                name: "drums".into(),
                created_at: Utc::now(),
            },
            sound_count: 3,
        };

        let json = serde_json::to_value(TagResponse::from(tag)).unwrap();
        assert_eq!(json["_id"], Uuid::nil().to_string());
        assert_eq!(json["name"], "drums");
        assert_eq!(json["soundCount"], 3);
    }
}
