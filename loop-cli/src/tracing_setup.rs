//! Tracing setup for the `loopctl` binary
//!
//! Usage:
//!   loopctl --debug serve                # Debug logging to console
//!   RUST_LOG=loop_server=debug loopctl  # Fine-grained log control
//!
//! Filter precedence: `RUST_LOG`, then `--debug`, then `log_level` from
//! the config file, then `info`.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Force debug level unless RUST_LOG is explicitly set
    pub debug: bool,
    /// Level from the config file
    pub level: Option<String>,
}

impl TracingConfig {
    fn fallback_directive(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            self.level.as_deref().unwrap_or("info")
        }
    }
}

pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.fallback_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_wins_over_config_level() {
        let config = TracingConfig {
            debug: true,
            level: Some("warn".into()),
        };
        assert_eq!(config.fallback_directive(), "debug");
    }

    #[test]
    fn config_level_used_when_not_debugging() {
        let config = TracingConfig {
            debug: false,
            level: Some("loop_server=trace".into()),
        };
        assert_eq!(config.fallback_directive(), "loop_server=trace");
        assert_eq!(TracingConfig::default().fallback_directive(), "info");
    }
}
