//! loopctl - command-line entry point for the LOOP music collaboration API
//!
//! - `serve`: run the REST API
//! - `migrate`: create the database schema
//! - `user add`: seed accounts (sign-in lives outside this service)
//! - `token`: mint a development bearer token
//! - `config`: inspect `~/.loop/config.toml`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod tracing_setup;

use commands::config::{run_config, ConfigArgs};
use commands::migrate::{run_migrate, MigrateArgs};
use commands::serve::{run_serve, ServeArgs};
use commands::token::{run_token, TokenArgs};
use commands::user::{run_user, UserArgs};
use config::LoopConfig;
use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "loopctl",
    author,
    version,
    about = "LOOP music collaboration server",
    long_about = "Serve and administer the LOOP API: sounds, collaborative projects, \
                  tags and fork lineage backed by PostgreSQL."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.loop/config.toml)
    #[arg(long, global = true, env = "LOOP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Create tables and indexes (idempotent)
    Migrate(MigrateArgs),
    /// Manage user accounts
    User(UserArgs),
    /// Mint a bearer token for a user (development only)
    Token(TokenArgs),
    /// Inspect configuration
    Config(ConfigArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` values feed clap's `env = ...` fallbacks
    config::load_dotenv();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(LoopConfig::default_path);
    let config = LoopConfig::load(&config_path)?;

    init_tracing(&TracingConfig {
        debug: cli.debug,
        level: config.log_level.clone(),
    })?;

    match cli.command {
        Commands::Serve(args) => run_serve(args, &config).await,
        Commands::Migrate(args) => run_migrate(args, &config).await,
        Commands::User(args) => run_user(args, &config).await,
        Commands::Token(args) => run_token(args, &config),
        Commands::Config(args) => run_config(args, &config_path, &config),
        Commands::Completions(args) => run_completions(args),
    }
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["loopctl", "config", "path", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Config(_)));
    }
}
