//! Sound endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tags::TagRef;
use super::users::{MessageResponse, UserRef};
use crate::db::repos::{NewSound, ProjectRepo, SoundChanges, SoundDetail, SoundRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::media::Upload;
use crate::models::{
    require_owner, Bpm, Description, Duration, Paginated, Pagination, PaginationParams, TagName,
    Title, ValidationError,
};

/// Sound response with creator and tags populated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub bpm: i32,
    pub duration: Option<f64>,
    pub description: Option<String>,
    pub sound_url: Option<String>,
    pub is_master_sound: bool,
    pub creator: Option<UserRef>,
    pub tags: Vec<TagRef>,
    pub project_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SoundDetail> for SoundResponse {
    fn from(d: SoundDetail) -> Self {
        Self {
            id: d.sound.id,
            title: d.sound.title,
            bpm: d.sound.bpm,
            duration: d.sound.duration,
            description: d.sound.description,
            sound_url: d.sound.sound_url,
            is_master_sound: d.sound.is_master_sound,
            creator: d.creator.map(UserRef::from),
            tags: d.tags.into_iter().map(TagRef::from).collect(),
            project_ids: d.project_ids,
            created_at: d.sound.created_at,
            updated_at: d.sound.updated_at,
        }
    }
}

/// Create sound request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSoundRequest {
    pub title: String,
    pub bpm: i64,
    pub duration: Option<f64>,
    pub description: Option<String>,
    #[serde(alias = "soundURL")]
    pub sound_url: Option<String>,
    #[serde(default)]
    pub is_master_sound: bool,
    /// Tag names; unknown names are created
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: Option<Uuid>,
}

impl CreateSoundRequest {
    fn validate(self) -> Result<NewSound, ValidationError> {
        Ok(NewSound {
            title: Title::new(&self.title)?,
            bpm: Bpm::new(self.bpm)?,
            duration: Duration::parse(self.duration)?,
            description: Description::parse(self.description.as_deref())?,
            sound_url: self.sound_url.filter(|u| !u.trim().is_empty()),
            is_master_sound: self.is_master_sound,
            tags: TagName::parse_all(&self.tags)?,
            project_id: self.project_id,
        })
    }
}

/// Update sound request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSoundRequest {
    pub title: Option<String>,
    pub bpm: Option<i64>,
    pub duration: Option<f64>,
    pub description: Option<String>,
    #[serde(alias = "soundURL")]
    pub sound_url: Option<String>,
    pub is_master_sound: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl UpdateSoundRequest {
    fn validate(self) -> Result<SoundChanges, ValidationError> {
        Ok(SoundChanges {
            title: self.title.as_deref().map(Title::new).transpose()?,
            bpm: self.bpm.map(Bpm::new).transpose()?,
            duration: Duration::parse(self.duration)?,
            description: Description::parse(self.description.as_deref())?,
            sound_url: self.sound_url.filter(|u| !u.trim().is_empty()),
            is_master_sound: self.is_master_sound,
            tags: self.tags.as_deref().map(TagName::parse_all).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_url: String,
    pub duration: Option<f64>,
}

/// GET /api/sounds - list sounds with pagination
async fn list_sounds(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<SoundResponse>>, ApiError> {
    let page = Pagination::from(params);
    let sounds = SoundRepo::new(&state.pool).list(page).await?;
    Ok(Json(sounds.map(SoundResponse::from)))
}

/// POST /api/sounds - create a sound owned by the caller
async fn create_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidJson(req): ValidJson<CreateSoundRequest>,
) -> Result<(StatusCode, Json<SoundResponse>), ApiError> {
    let new = req.validate()?;

    if let Some(project_id) = new.project_id {
        ProjectRepo::new(&state.pool)
            .access(project_id)
            .await?
            .require_collaborator(caller.id, "only project collaborators can add sounds")?;
    }

    let sound = SoundRepo::new(&state.pool).create(caller.id, new).await?;
    Ok((StatusCode::CREATED, Json(sound.into())))
}

/// POST /api/sounds/upload?filename= - store a raw mp3/wav body
async fn upload_sound(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    ValidQuery(params): ValidQuery<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.max_upload_bytes,
            }
        } else {
            ApiError::Validation(ValidationError::Malformed {
                field: "upload",
                message: rejection.body_text(),
            })
        }
    })?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let stored = state
        .media
        .store(Upload {
            filename: params.filename.unwrap_or_default(),
            content_type,
            bytes,
        })
        .await?;

    Ok(Json(UploadResponse {
        file_url: stored.url,
        duration: stored.duration,
    }))
}

/// GET /api/sounds/user/{userId}
async fn sounds_by_user(
    State(state): State<Arc<AppState>>,
    ValidPath(user_id): ValidPath<Uuid>,
) -> Result<Json<Vec<SoundResponse>>, ApiError> {
    let sounds = SoundRepo::new(&state.pool).list_by_creator(user_id).await?;
    Ok(Json(sounds.into_iter().map(SoundResponse::from).collect()))
}

/// GET /api/sounds/{id}
async fn get_sound(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<SoundResponse>, ApiError> {
    let sound = SoundRepo::new(&state.pool).get(id).await?;
    Ok(Json(sound.into()))
}

/// PUT /api/sounds/{id} - creator only
async fn update_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateSoundRequest>,
) -> Result<Json<SoundResponse>, ApiError> {
    let changes = req.validate()?;
    let repo = SoundRepo::new(&state.pool);

    require_owner(
        repo.creator_of(id).await?,
        caller.id,
        "only the creator can edit this sound",
    )?;

    let sound = repo.update(id, changes).await?;
    Ok(Json(sound.into()))
}

/// DELETE /api/sounds/{id} - creator only
async fn delete_sound(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SoundRepo::new(&state.pool);

    require_owner(
        repo.creator_of(id).await?,
        caller.id,
        "only the creator can delete this sound",
    )?;

    repo.delete(id).await?;
    tracing::info!(sound_id = %id, "deleted sound");

    Ok(Json(MessageResponse {
        message: "Sound deleted successfully",
    }))
}

/// Sound routes
pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sounds", get(list_sounds).post(create_sound))
        .route(
            "/api/sounds/upload",
            post(upload_sound).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/sounds/user/{user_id}", get(sounds_by_user))
        .route(
            "/api/sounds/{id}",
            get(get_sound).put(update_sound).delete(delete_sound),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> CreateSoundRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn create_request_validates_fields() {
        let new = request(serde_json::json!({
            "title": "  Bassline ",
            "bpm": 92,
            "duration": 12.5,
            "soundURL": "http://localhost:5005/media/a.wav",
            "tags": ["bass", "Bass ", "bass"]
        }))
        .validate()
        .unwrap();

        assert_eq!(new.title.as_str(), "Bassline");
        assert_eq!(new.bpm.get(), 92);
        assert_eq!(new.sound_url.as_deref(), Some("http://localhost:5005/media/a.wav"));
        assert!(!new.is_master_sound);
        assert!(new.project_id.is_none());
    }

    #[test]
    fn create_request_rejects_bad_values() {
        let bad_bpm = request(serde_json::json!({ "title": "x", "bpm": 1000 })).validate();
        assert!(matches!(bad_bpm, Err(ValidationError::OutOfRange { .. })));

        let blank = request(serde_json::json!({ "title": " ", "bpm": 100 })).validate();
        assert!(matches!(blank, Err(ValidationError::Empty { .. })));

        let negative = request(serde_json::json!({ "title": "x", "bpm": 100, "duration": -1.0 }))
            .validate();
        assert!(negative.is_err());
    }

    #[test]
    fn missing_bpm_fails_to_deserialize() {
        let parsed: Result<CreateSoundRequest, _> =
            serde_json::from_value(serde_json::json!({ "title": "x" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn update_request_only_sets_present_fields() {
        let changes = UpdateSoundRequest {
            bpm: Some(140),
            tags: Some(vec![]),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert!(changes.title.is_none());
        assert_eq!(changes.bpm.map(Bpm::get), Some(140));
        assert_eq!(changes.tags.map(|t| t.len()), Some(0));
        assert!(changes.description.is_none());
    }

    #[test]
    fn update_request_ignores_blank_sound_url() {
        let changes = UpdateSoundRequest {
            sound_url: Some("   ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(changes.sound_url.is_none());

        let changes = UpdateSoundRequest {
            sound_url: Some("http://localhost:5005/media/b.mp3".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(changes.sound_url.as_deref(), Some("http://localhost:5005/media/b.mp3"));
    }
}
