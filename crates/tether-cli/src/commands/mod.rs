//! Subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tether::prelude::*;

use crate::OutputFormat;

pub mod call;
pub mod inspect;

/// Flags shared by every subcommand.
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub verbose: u8,
    pub quiet: bool,
}

impl GlobalArgs {
    /// Load the bridge configuration, if one was given.
    ///
    /// `-v` flags lower the bridge's log threshold along with the
    /// subscriber's.
    pub fn bridge_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => BridgeConfig::default(),
        };
        if self.verbose > 0 {
            config.min_log_level = LogLevel::from_verbosity(self.verbose);
        }
        Ok(config)
    }

    /// Build a runtime from the bridge configuration.
    pub fn runtime(&self) -> Result<TetherRuntime> {
        Tether::builder()
            .with_bridge_config(self.bridge_config()?)
            .build()
            .context("Failed to create runtime")
    }

    /// Print a serializable result in JSON, honoring the compact flag.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json = match self.format {
            OutputFormat::JsonCompact => serde_json::to_string(value)?,
            _ => serde_json::to_string_pretty(value)?,
        };
        println!("{}", json);
        Ok(())
    }
}
