//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod api;
pub mod args;
pub mod context;
pub mod login;
pub mod logout;
pub mod register;
pub mod sessions;
pub mod status;
pub mod whoami;

pub use args::OutputFormat;
pub use context::CommandContext;

/// BoincHub CLI - command-line companion for the BoincHub account manager
#[derive(Parser, Debug)]
#[command(name = "boinchub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "BOINCHUB_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "BOINCHUB_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the BoincHub API host
    #[arg(long, global = true, env = "BOINCHUB_API_HOST", hide_env = true)]
    pub api_host: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "BOINCHUB_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store a session
    Login {
        /// Username (prompted when omitted)
        #[arg(long, short)]
        username: Option<String>,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Sign out and discard the stored session
    Logout,

    /// Show session and configuration status
    Status,

    /// Show the signed-in user
    Whoami,

    /// Create a new account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Manage login sessions
    #[command(subcommand)]
    Sessions(SessionCommands),

    /// Send an authenticated request to any API path
    Api {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path under the API host, e.g. /api/v1/projects
        path: String,

        /// JSON request body
        #[arg(long, short)]
        data: Option<String>,

        /// Query parameter as KEY=VALUE (repeatable)
        #[arg(long = "query", short = 'q', value_name = "KEY=VALUE")]
        query: Vec<String>,
    },

    /// Display version information
    Version,
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List active sessions
    List,

    /// Revoke one or more sessions
    Revoke {
        /// Session IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Revoke every session except this one
    RevokeOthers,
}
