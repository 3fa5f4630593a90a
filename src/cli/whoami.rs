//! Whoami command implementation

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::client::AccountApi;
use crate::error::Result;
use crate::models::UserDisplay;
use crate::output::Formattable;

/// Show the identity behind the stored session
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let user = ctx.client.current_user().await?;

    if ctx.format != OutputFormat::Pretty {
        return vec![UserDisplay::from(user)].print(ctx.format);
    }

    println!("{} ({})", user.username.bold(), user.email);
    println!("  Role: {}", user.role);
    if user.role.is_admin() {
        println!("  {}", "Administrator".yellow());
    }
    if !user.is_active {
        println!("  {}", "Account is inactive".red());
    }
    Ok(())
}
