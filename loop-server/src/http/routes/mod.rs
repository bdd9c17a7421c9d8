//! HTTP route handlers
//!
//! Each module exposes `router()` returning a `Router<Arc<AppState>>`
//! merged by `build_router`.

pub mod health;
pub mod projects;
pub mod sounds;
pub mod tags;
pub mod users;
