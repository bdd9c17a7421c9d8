use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::LoopConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show config file path
    Path,
    /// Print the loaded config as TOML (secrets redacted)
    Show,
}

pub fn run_config(args: ConfigArgs, path: &Path, config: &LoopConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let toml_str = toml::to_string_pretty(&config.redacted())
                .context("Failed to serialize config")?;
            print!("{toml_str}");
            Ok(())
        }
    }
}
