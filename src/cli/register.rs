//! Register command implementation

use colored::Colorize;
use dialoguer::{Password, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::cli::login::read_password_stdin;
use crate::cli::{CommandContext, OutputFormat};
use crate::client::{AccountApi, RegisterRequest};
use crate::error::Result;
use crate::models::UserDisplay;
use crate::output::Formattable;

/// Route of the registration screen; it is public
const REGISTER_ROUTE: &str = "/register";

/// Create a new account
pub async fn run(
    opts: &GlobalOptions,
    username: String,
    email: String,
    password_stdin: bool,
) -> Result<()> {
    let ctx = CommandContext::on_route(opts, REGISTER_ROUTE)?;

    let password = if password_stdin {
        read_password_stdin()?
    } else {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?
    };

    let user = ctx
        .client
        .register(&RegisterRequest {
            username,
            email,
            password,
        })
        .await?;

    if ctx.format != OutputFormat::Pretty {
        return vec![UserDisplay::from(user)].print(ctx.format);
    }

    println!("{} Account {} created", "✓".green(), user.username.bold());
    println!("  → Run '{}' to sign in", "boinchub login".cyan());
    Ok(())
}
