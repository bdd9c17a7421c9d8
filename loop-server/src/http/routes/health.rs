//! Health, welcome and status endpoints

use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api
async fn welcome() -> Json<&'static str> {
    Json("Welcome to the LOOP music collaboration API")
}

/// GET /api/status
async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "active",
        message: "API is running normally",
        timestamp: Utc::now(),
    })
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api", get(welcome))
        .route("/api/status", get(status))
}
