//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses `{ "error": <code>, "message": <text> }`
//! with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::db::repos::DbError;
use crate::media::MediaError;
use crate::models::{AccessDenied, ValidationError};

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Unique constraint hit (400)
    Duplicate { resource: &'static str, id: String },

    /// Missing or invalid bearer token (401)
    Unauthorized(AuthError),

    /// Authenticated but not allowed (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Upload over the configured limit (413)
    PayloadTooLarge { limit: usize },

    /// Upload is not mp3/wav (415)
    UnsupportedMedia(String),

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    /// 404 for a route that does not exist.
    pub fn no_endpoint(method: &str, path: &str) -> Self {
        Self::NotFound {
            resource: "endpoint",
            id: format!("{method} {path}"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Duplicate { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            Self::Validation(e) => ("validation_error", e.to_string()),
            Self::Duplicate { resource, id } => {
                ("duplicate", format!("{} '{}' already exists", resource, id))
            }
            Self::Unauthorized(e) => ("unauthorized", e.to_string()),
            Self::Forbidden { reason } => ("forbidden", reason),
            Self::NotFound { resource, id } => {
                ("not_found", format!("{} '{}' not found", resource, id))
            }
            Self::PayloadTooLarge { limit } => (
                "payload_too_large",
                format!("upload exceeds the limit of {} bytes", limit),
            ),
            Self::UnsupportedMedia(what) => ("unsupported_media_type", what),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_owned())
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_owned())
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Duplicate { resource, id } => Self::Duplicate { resource, id },
            _ => Self::Database(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Unauthorized(e)
    }
}

impl From<AccessDenied> for ApiError {
    fn from(e: AccessDenied) -> Self {
        Self::Forbidden {
            reason: e.reason.to_owned(),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        let message = e.to_string();
        match e {
            MediaError::Unsupported(_) => Self::UnsupportedMedia(message),
            MediaError::Empty => Self::Validation(ValidationError::Empty { field: "upload" }),
            MediaError::Io(_) => Self::Internal {
                message: format!("media store: {}", message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Empty { field: "title" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "title cannot be empty");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err = ApiError::NotFound {
            resource: "project",
            id: "abc".into(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "project 'abc' not found");
    }

    #[tokio::test]
    async fn unknown_endpoint_message() {
        let response = ApiError::no_endpoint("GET", "/api/nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["message"],
            "endpoint 'GET /api/nope' not found"
        );
    }

    #[tokio::test]
    async fn db_errors_are_classified() {
        let dup: ApiError = DbError::duplicate("member", "u1").into();
        assert_eq!(dup.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = DbError::not_found("sound", "s1").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let internal: ApiError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
        let response = internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn auth_and_access_errors() {
        let unauthorized: ApiError = AuthError::Expired.into();
        let response = unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");

        let forbidden: ApiError = AccessDenied {
            reason: "only the creator can delete this project",
        }
        .into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn media_errors_map_to_status() {
        let unsupported: ApiError = MediaError::Unsupported("ogg".into()).into();
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let empty: ApiError = MediaError::Empty.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let too_large = ApiError::PayloadTooLarge { limit: 10 };
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
