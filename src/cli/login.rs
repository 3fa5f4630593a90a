//! Login command implementation

use std::io::BufRead;

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use serde_json::json;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::{Error, Result};
use crate::output::json::format_json;
use crate::session::LOGIN_ROUTE;

/// Run the login command
pub async fn run(opts: &GlobalOptions, username: Option<String>, password_stdin: bool) -> Result<()> {
    let mut ctx = CommandContext::on_route(opts, LOGIN_ROUTE)?;

    let username = match username {
        Some(username) => username,
        None => {
            let theme = ColorfulTheme::default();
            let mut input = Input::<String>::with_theme(&theme).with_prompt("Username");
            if let Some(last) = &ctx.config.username {
                input = input.default(last.clone());
            }
            input.interact_text()?
        }
    };

    let password = if password_stdin {
        read_password_stdin()?
    } else {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()?
    };

    let token = ctx.client.session().login(&username, &password).await?;

    ctx.config.username = Some(username.clone());
    ctx.save_config()?;

    match ctx.format {
        OutputFormat::Json => {
            let report = json!({
                "username": username,
                "expires_at": token.expires_at,
            });
            println!("{}", format_json(&report)?);
        }
        _ => {
            println!("{} Logged in as {}", "✓".green(), username.bold());
            println!(
                "  Access token valid until {}",
                token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    Ok(())
}

/// Read a single line from stdin, without the trailing newline
pub fn read_password_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(Error::Other("no password supplied on stdin".to_string()));
    }
    Ok(password)
}
