//! Account seeding
//!
//! The API never creates accounts (sign-in happens elsewhere), so local
//! and test deployments add users here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loop_server::db::{NewUser, UserRepo};
use loop_server::models::{DisplayName, Email};

use super::DatabaseArgs;
use crate::config::LoopConfig;

#[derive(Parser, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user account
    Add(AddArgs),
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Email address (unique, stored lowercased)
    #[arg(long)]
    pub email: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Avatar image URL
    #[arg(long)]
    pub avatar: Option<String>,

    /// Print the created user as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

pub async fn run_user(args: UserArgs, config: &LoopConfig) -> Result<()> {
    match args.command {
        UserCommands::Add(args) => run_add(args, config).await,
    }
}

async fn run_add(args: AddArgs, config: &LoopConfig) -> Result<()> {
    // Validate before connecting so typos fail fast
    let new = NewUser {
        email: Email::new(&args.email)?,
        name: DisplayName::new(&args.name)?,
        avatar: args.avatar.filter(|a| !a.trim().is_empty()),
    };

    let pool = args.db.connect(config).await?;
    let user = UserRepo::new(&pool)
        .create(new)
        .await
        .context("Failed to create user")?;

    tracing::info!(user_id = %user.id, "created user");

    if args.json {
        let value = serde_json::json!({
            "_id": user.id,
            "email": user.email,
            "name": user.name,
            "avatar": user.avatar,
            "createdAt": user.created_at,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", user.id);
    }

    Ok(())
}
