//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global flags handed to every command handler.
///
/// Precedence for the API host is: CLI flag > environment variable > config
/// file > default. The first two layers are captured here; the config layer
/// is resolved in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.boinchub/config.yaml)
    pub config: Option<String>,

    /// API host override
    pub api_host: Option<String>,
}

impl GlobalOptions {
    /// Create GlobalOptions from the parsed CLI, once in main.rs
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            api_host: cli.api_host.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn api_host_ref(&self) -> Option<&str> {
        self.api_host.as_deref()
    }
}
