//! Logout command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::error::Result;

/// Run the logout command.
///
/// Always succeeds locally, even when the backend cannot be reached.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let session = ctx.client.session();

    if session.current_token().is_none() {
        println!("{} Not logged in", "○".dimmed());
    }

    session.logout().await;
    println!("{} Logged out", "✓".green());
    Ok(())
}
