//! BoincHub CLI - command-line companion for the BoincHub account manager

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod session;

use cli::args::GlobalOptions;
use cli::{Cli, Commands, SessionCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Login {
            username,
            password_stdin,
        } => cli::login::run(&opts, username, password_stdin).await,
        Commands::Logout => cli::logout::run(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Whoami => cli::whoami::run(&opts).await,
        Commands::Register {
            username,
            email,
            password_stdin,
        } => cli::register::run(&opts, username, email, password_stdin).await,
        Commands::Sessions(command) => match command {
            SessionCommands::List => cli::sessions::list(&opts).await,
            SessionCommands::Revoke { ids } => cli::sessions::revoke(&opts, &ids).await,
            SessionCommands::RevokeOthers => cli::sessions::revoke_others(&opts).await,
        },
        Commands::Api {
            method,
            path,
            data,
            query,
        } => cli::api::run(&opts, &method, &path, data.as_deref(), &query).await,
        Commands::Version => {
            println!("boinchub version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `--debug` turns on debug output for this crate; `RUST_LOG` wins when set
fn init_logging(debug: bool) {
    let default_filter = if debug { "boinchub=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
