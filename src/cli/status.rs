//! Status command implementation

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::json::format_json;
use crate::session::SessionState;

/// Machine-readable status
#[derive(Debug, Serialize)]
struct StatusReport {
    config_path: String,
    api_host: String,
    username: Option<String>,
    authenticated: bool,
    expires_at: Option<chrono::DateTime<Utc>>,
}

/// Show local session and configuration state. Never touches the network.
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let session = ctx.client.session();

    let report = StatusReport {
        config_path: ctx.config_path.display().to_string(),
        api_host: session.transport().base_url().to_string(),
        username: ctx.config.username.clone(),
        authenticated: session.is_authenticated(),
        expires_at: session.expires_at(),
    };

    if ctx.format == OutputFormat::Json {
        println!("{}", format_json(&report)?);
        return Ok(());
    }

    println!("{}\n", "BoincHub Status".bold());
    println!("Config file: {}", report.config_path.cyan());
    println!("API host: {}", report.api_host.cyan());
    println!();

    match (session.state(), report.expires_at) {
        (SessionState::Authenticated, Some(expires_at)) => {
            let remaining = expires_at.signed_duration_since(Utc::now());
            println!(
                "{} Signed in{} (token expires in {}m)",
                "✓".green(),
                report
                    .username
                    .as_deref()
                    .map(|u| format!(" as {}", u.bold()))
                    .unwrap_or_default(),
                remaining.num_minutes().max(0)
            );
        }
        (_, Some(_)) => {
            println!(
                "{} Access token expired (will refresh on next command)",
                "⚠".yellow()
            );
        }
        _ => {
            println!("{} Not signed in", "○".dimmed());
            println!("  → Run '{}' to sign in", "boinchub login".cyan());
        }
    }
    println!();

    Ok(())
}
