pub mod config;
pub mod migrate;
pub mod serve;
pub mod token;
pub mod user;

use anyhow::{Context, Result};
use clap::Args;
use loop_server::db::{create_pool, create_pool_with_options, PgPool};

use crate::config::LoopConfig;

/// Connection flags shared by every command that talks to Postgres
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

impl DatabaseArgs {
    pub fn resolve_url(&self, config: &LoopConfig) -> Result<String> {
        self.database_url
            .clone()
            .or_else(|| config.database.url.clone())
            .filter(|url| !url.trim().is_empty())
            .context(
                "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, \
                 ~/.loop/.env or [database].url in ~/.loop/config.toml",
            )
    }

    pub async fn connect(&self, config: &LoopConfig) -> Result<PgPool> {
        let url = self.resolve_url(config)?;
        let pool = match config.database.max_connections {
            Some(max) => create_pool_with_options(&url, max).await,
            None => create_pool(&url).await,
        };
        pool.context("Failed to create database pool")
    }
}
