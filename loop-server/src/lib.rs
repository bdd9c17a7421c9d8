//! loop-server: REST API for LOOP, a music collaboration service
//!
//! Users upload short audio clips ("sounds"), group them into
//! collaborative projects, tag them, and fork each other's projects.
//! Fork lineage is rebuilt on demand from parent pointers.
//!
//! Layers, bottom-up:
//! - [`models`]: validated domain values, access rules, lineage
//! - [`auth`]: bearer token verification
//! - [`media`]: upload storage
//! - [`db`]: PostgreSQL pool, schema and repositories
//! - [`http`]: axum router, extractors and error mapping

pub mod auth;
pub mod db;
pub mod http;
pub mod media;
pub mod models;

pub use auth::{AuthError, AuthKeys, Claims};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
pub use media::{LocalMediaStore, MediaError, MediaStore};
