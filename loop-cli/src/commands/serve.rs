//! HTTP server command
//!
//! Connects to Postgres, ensures the schema exists and serves the LOOP API
//! until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use loop_server::db::migrations;
use loop_server::http::DEFAULT_MAX_UPLOAD_BYTES;
use loop_server::{run_server, AppState, AuthKeys, LocalMediaStore, ServerConfig};

use super::DatabaseArgs;
use crate::config::LoopConfig;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:5005)
    #[arg(long, short = 'b', env = "LOOP_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,

    /// HMAC secret used to verify bearer tokens
    #[arg(long, env = "LOOP_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Directory uploaded audio is written to and served from
    #[arg(long)]
    pub media_root: Option<PathBuf>,

    /// Base URL returned for uploaded files (default: http://<bind>/media)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Maximum upload size in bytes
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Skip schema setup on startup
    #[arg(long)]
    pub no_migrate: bool,
}

/// Everything `serve` needs after merging flags, environment and config
#[derive(Debug)]
struct Resolved {
    server: ServerConfig,
    token_secret: String,
    public_base_url: String,
    max_upload_bytes: usize,
}

fn resolve(args: &ServeArgs, config: &LoopConfig) -> Result<Resolved> {
    let mut server = ServerConfig::default();

    if let Some(bind) = args.bind.or(config.bind_addr()?) {
        server.bind_addr = bind;
    }
    server.cors_permissive = args.cors_permissive || config.server.cors_permissive;
    if !config.server.allowed_origins.is_empty() {
        server.allowed_origins = config.server.allowed_origins.clone();
    }
    if let Some(secs) = config.server.request_timeout_secs {
        server.request_timeout = Duration::from_secs(secs);
    }
    if let Some(root) = args.media_root.clone().or_else(|| config.media.root.clone()) {
        server.media_root = root;
    }

    let token_secret = args
        .token_secret
        .clone()
        .or_else(|| config.auth.token_secret.clone())
        .filter(|s| !s.is_empty());
    let Some(token_secret) = token_secret else {
        bail!(
            "No token secret configured. Set via --token-secret, LOOP_TOKEN_SECRET env \
             or [auth].token_secret in ~/.loop/config.toml"
        );
    };

    let public_base_url = args
        .public_base_url
        .clone()
        .or_else(|| config.media.public_base_url.clone())
        .unwrap_or_else(|| format!("http://{}/media", server.bind_addr));

    let max_upload_bytes = args
        .max_upload_bytes
        .or(config.media.max_upload_bytes)
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    Ok(Resolved {
        server,
        token_secret,
        public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        max_upload_bytes,
    })
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config: &LoopConfig) -> Result<()> {
    let resolved = resolve(&args, config)?;

    let pool = args.db.connect(config).await?;

    if args.no_migrate {
        tracing::debug!("skipping schema setup");
    } else {
        migrations::run(&pool)
            .await
            .context("Failed to set up database schema")?;
    }

    tokio::fs::create_dir_all(&resolved.server.media_root)
        .await
        .with_context(|| {
            format!(
                "Failed to create media directory {}",
                resolved.server.media_root.display()
            )
        })?;

    let media = LocalMediaStore::new(&resolved.server.media_root, resolved.public_base_url);
    let state = AppState::new(pool, AuthKeys::new(&resolved.token_secret), Arc::new(media))
        .with_max_upload_bytes(resolved.max_upload_bytes);

    tracing::info!("Starting LOOP server on {}", resolved.server.bind_addr);

    run_server(state, resolved.server)
        .await
        .context("Server error")?;

    Ok(())
}
