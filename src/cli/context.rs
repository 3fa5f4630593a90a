//! Command execution context
//!
//! Wires config, transport, token storage and navigation into a session
//! manager and API client so handlers don't repeat the setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::{BoincHubClient, HttpTransport};
use crate::config::Config;
use crate::error::Result;
use crate::session::{CliNavigator, FileTokenStore, SessionManager};

/// Route a command runs on when it needs no special navigation treatment
pub const HOME_ROUTE: &str = "/";

/// Everything a command handler needs
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Resolved config file location
    pub config_path: PathBuf,
    /// Client whose requests go through the authenticated pipeline
    pub client: BoincHubClient,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build a context for a command on [`HOME_ROUTE`]
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        Self::on_route(opts, HOME_ROUTE)
    }

    /// Build a context for a command that runs on `route`.
    ///
    /// The route decides whether a failed refresh redirects to login.
    pub fn on_route(opts: &GlobalOptions, route: &str) -> Result<Self> {
        let config_path = Config::resolve_path(opts.config_ref())?;
        let config = Config::load_at(opts.config_ref())?;
        let api_host = config.api_host(opts.api_host_ref());
        debug!("Using API host {} (config {})", api_host, config_path.display());

        let transport = HttpTransport::with_cookie_file(
            &api_host,
            Duration::from_secs(config.session.request_timeout_secs),
            Config::cookie_path(&config_path),
        )?;
        let session = SessionManager::new(
            transport,
            Arc::new(FileTokenStore::new(Config::session_path(&config_path))),
            Arc::new(CliNavigator::new(route)),
            config.session.expiry_buffer()?,
        );
        let client = BoincHubClient::new(session, config.session.proactive_refresh);

        Ok(Self {
            config,
            config_path,
            client,
            format: opts.format,
        })
    }

    /// Persist config changes back to the resolved path
    pub fn save_config(&self) -> Result<()> {
        self.config.save_to(&self.config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AccessToken;
    use chrono::Utc;

    fn opts_for(dir: &tempfile::TempDir) -> GlobalOptions {
        GlobalOptions {
            format: OutputFormat::Table,
            config: Some(dir.path().join("config.yaml").display().to_string()),
            api_host: Some("http://127.0.0.1:9/".to_string()),
        }
    }

    #[test]
    fn test_context_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CommandContext::new(&opts_for(&dir)).unwrap();

        assert_eq!(ctx.client.session().transport().base_url(), "http://127.0.0.1:9");
        assert!(!ctx.client.session().is_authenticated());
        assert_eq!(ctx.format, OutputFormat::Table);
    }

    #[test]
    fn test_context_picks_up_stored_session() {
        let dir = tempfile::tempdir().unwrap();
        let opts = opts_for(&dir);
        let path = Config::resolve_path(opts.config_ref()).unwrap();

        let store = FileTokenStore::new(Config::session_path(&path));
        crate::session::TokenStore::save(
            &store,
            &AccessToken {
                token: "abc".to_string(),
                expires_at: Utc::now() + chrono::Duration::minutes(30),
            },
        )
        .unwrap();

        let ctx = CommandContext::new(&opts).unwrap();
        assert_eq!(ctx.client.session().current_token().unwrap().token, "abc");
    }

    #[test]
    fn test_context_rejects_oversized_expiry_buffer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "session:\n  expiry_buffer_secs: 18446744073709551615\n",
        )
        .unwrap();

        let err = CommandContext::new(&opts_for(&dir)).err().unwrap();
        assert!(err.to_string().contains("expiry_buffer_secs"));
    }

    #[test]
    fn test_save_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::new(&opts_for(&dir)).unwrap();
        ctx.config.username = Some("alice".to_string());
        ctx.save_config().unwrap();

        let reloaded = Config::load_from(&ctx.config_path).unwrap();
        assert_eq!(reloaded.username.as_deref(), Some("alice"));
    }
}
