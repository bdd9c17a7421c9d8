//! Database layer - connection pool, schema and repositories
//!
//! # Design Principles
//!
//! - Connection pool, no Arc<Mutex<Connection>>
//! - Populated responses are batch-loaded with `= ANY($1)`, no N+1 queries
//! - Rely on DB constraints and classify violations, no check-then-insert
//! - Transactions for multi-step writes

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options, lazy_pool};
pub use repos::*;
pub use sqlx::PgPool;
