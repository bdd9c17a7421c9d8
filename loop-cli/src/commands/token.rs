//! Development bearer tokens
//!
//! Signs a token with the server's secret so API calls can be made
//! without the external identity provider.

use anyhow::{bail, Context, Result};
use clap::Parser;
use loop_server::AuthKeys;
use uuid::Uuid;

use crate::config::LoopConfig;

const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// User id the token authenticates as
    pub user_id: Uuid,

    /// Display name carried in the token
    #[arg(long)]
    pub name: Option<String>,

    /// Lifetime in hours (default: [auth].token_ttl_hours or 24)
    #[arg(long)]
    pub ttl_hours: Option<i64>,

    /// HMAC secret; must match the server's
    #[arg(long, env = "LOOP_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,
}

pub fn mint(args: &TokenArgs, config: &LoopConfig) -> Result<String> {
    let secret = args
        .token_secret
        .clone()
        .or_else(|| config.auth.token_secret.clone())
        .filter(|s| !s.is_empty())
        .context(
            "No token secret configured. Set via --token-secret, LOOP_TOKEN_SECRET env \
             or [auth].token_secret in ~/.loop/config.toml",
        )?;

    let ttl_hours = args
        .ttl_hours
        .or(config.auth.token_ttl_hours)
        .unwrap_or(DEFAULT_TTL_HOURS);
    if ttl_hours <= 0 {
        bail!("--ttl-hours must be positive, got {ttl_hours}");
    }

    let token = AuthKeys::new(secret).issue(
        args.user_id,
        args.name.as_deref(),
        chrono::Duration::hours(ttl_hours),
    )?;
    Ok(token)
}

pub fn run_token(args: TokenArgs, config: &LoopConfig) -> Result<()> {
    println!("{}", mint(&args, config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(secret: Option<&str>) -> TokenArgs {
        TokenArgs {
            user_id: Uuid::new_v4(),
            name: Some("Ana".into()),
            ttl_hours: None,
            token_secret: secret.map(str::to_owned),
        }
    }

    #[test]
    fn minted_token_verifies_with_same_secret() {
        let args = args(Some("dev-secret"));
        let token = mint(&args, &LoopConfig::default()).unwrap();

        let claims = AuthKeys::new("dev-secret").verify(&token).unwrap();
        assert_eq!(claims.user_id, args.user_id);
        assert_eq!(claims.name.as_deref(), Some("Ana"));
        assert!(AuthKeys::new("other").verify(&token).is_err());
    }

    #[test]
    fn secret_falls_back_to_config() {
        let mut config = LoopConfig::default();
        config.auth.token_secret = Some("from-file".into());
        config.auth.token_ttl_hours = Some(1);

        let token = mint(&args(None), &config).unwrap();
        assert!(AuthKeys::new("from-file").verify(&token).is_ok());
    }

    #[test]
    fn rejects_missing_secret_and_bad_ttl() {
        assert!(mint(&args(None), &LoopConfig::default()).is_err());

        let mut bad = args(Some("s"));
        bad.ttl_hours = Some(0);
        assert!(mint(&bad, &LoopConfig::default()).is_err());
    }
}
