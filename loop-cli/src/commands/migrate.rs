//! Schema setup command

use anyhow::{Context, Result};
use clap::Parser;
use loop_server::db::migrations;

use super::DatabaseArgs;
use crate::config::LoopConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

/// Create tables and indexes; safe to run repeatedly
pub async fn run_migrate(args: MigrateArgs, config: &LoopConfig) -> Result<()> {
    let pool = args.db.connect(config).await?;

    migrations::run(&pool)
        .await
        .context("Failed to set up database schema")?;

    println!("Schema is up to date");
    Ok(())
}
