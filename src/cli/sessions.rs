//! Session management commands

use colored::Colorize;
use log::debug;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::client::AccountApi;
use crate::error::{Error, Result};
use crate::models::SessionDisplay;
use crate::output::Formattable;

/// List the user's sessions, most recently used first
pub async fn list(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let mut sessions = ctx.client.list_sessions().await?;
    debug!("Fetched {} sessions", sessions.len());

    sessions.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
    let rows: Vec<SessionDisplay> = sessions.into_iter().map(SessionDisplay::from).collect();
    rows.print(ctx.format)
}

/// Revoke sessions by ID; fails if any revocation failed
pub async fn revoke(opts: &GlobalOptions, ids: &[String]) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let outcomes = ctx.client.revoke_sessions(ids).await;

    let mut failed = 0;
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => println!("{} Revoked {}", "✓".green(), id),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "✗".red(), id, e);
            }
        }
    }

    if failed > 0 {
        return Err(Error::Other(format!(
            "{} of {} sessions could not be revoked",
            failed,
            ids.len()
        )));
    }
    Ok(())
}

/// Revoke every session except the current one
pub async fn revoke_others(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let message = ctx.client.logout_all().await?;
    println!("{} {}", "✓".green(), message);
    Ok(())
}
