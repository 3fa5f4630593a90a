//! Configuration management for the BoincHub CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default BoincHub API host
pub const DEFAULT_API_HOST: &str = "http://localhost:8000";

/// Session state file kept next to the config file
const SESSION_FILE: &str = "session.yaml";

/// Cookie jar file kept next to the config file
const COOKIE_FILE: &str = "cookies.yaml";

/// Largest accepted expiry buffer; BoincHub tokens live for minutes, not days
pub const MAX_EXPIRY_BUFFER_SECS: u64 = 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// BoincHub API host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// Username from the last successful login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionPreferences,
}

/// Session preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPreferences {
    /// Treat the access token as expired this many seconds early
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: u64,

    /// Refresh a token that is about to expire before sending a request
    #[serde(default = "default_proactive_refresh")]
    pub proactive_refresh: bool,

    /// Transport request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_expiry_buffer_secs() -> u64 {
    60
}

fn default_proactive_refresh() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SessionPreferences {
    /// The expiry buffer as a duration, rejecting values above [`MAX_EXPIRY_BUFFER_SECS`]
    pub fn expiry_buffer(&self) -> Result<chrono::Duration> {
        match i64::try_from(self.expiry_buffer_secs) {
            Ok(secs) if self.expiry_buffer_secs <= MAX_EXPIRY_BUFFER_SECS => {
                Ok(chrono::Duration::seconds(secs))
            }
            _ => Err(ConfigError::Invalid(format!(
                "session.expiry_buffer_secs must be at most {} (got {})",
                MAX_EXPIRY_BUFFER_SECS, self.expiry_buffer_secs
            ))
            .into()),
        }
    }
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            expiry_buffer_secs: default_expiry_buffer_secs(),
            proactive_refresh: default_proactive_refresh(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".boinchub").join("config.yaml"))
    }

    /// Resolve an optional path override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        write_private(path, &contents)
    }

    /// API host with precedence: explicit override > config file > default
    pub fn api_host(&self, override_host: Option<&str>) -> String {
        override_host
            .map(str::to_string)
            .or_else(|| self.api_host.clone())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Path of the session file that sits beside the config file
    pub fn session_path(config_path: &Path) -> PathBuf {
        sibling(config_path, SESSION_FILE)
    }

    /// Path of the cookie jar file that sits beside the config file
    pub fn cookie_path(config_path: &Path) -> PathBuf {
        sibling(config_path, COOKIE_FILE)
    }
}

fn sibling(config_path: &Path, name: &str) -> PathBuf {
    match config_path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Write a file readable only by the current user
pub fn write_private(path: &Path, contents: &str) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, contents)?;

    // Set file permissions to 600 on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_host.is_none());
        assert!(config.username.is_none());
        assert_eq!(config.session.expiry_buffer_secs, 60);
        assert!(config.session.proactive_refresh);
        assert_eq!(config.session.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent.yaml");
        let config = Config::load_at(path.to_str()).unwrap();
        assert!(config.api_host.is_none());
    }

    #[test]
    fn test_partial_session_section_uses_defaults() {
        let config: Config =
            serde_yaml::from_str("api_host: https://hub.example\nsession:\n  expiry_buffer_secs: 5\n")
                .unwrap();
        assert_eq!(config.session.expiry_buffer_secs, 5);
        assert!(config.session.proactive_refresh);
        assert_eq!(config.session.request_timeout_secs, 30);
    }

    #[test]
    fn test_expiry_buffer_bounds() {
        let mut prefs = SessionPreferences::default();
        assert_eq!(prefs.expiry_buffer().unwrap(), chrono::Duration::seconds(60));

        prefs.expiry_buffer_secs = MAX_EXPIRY_BUFFER_SECS;
        assert_eq!(prefs.expiry_buffer().unwrap(), chrono::Duration::days(1));

        for secs in [MAX_EXPIRY_BUFFER_SECS + 1, i64::MAX as u64 + 1, u64::MAX] {
            prefs.expiry_buffer_secs = secs;
            assert!(matches!(
                prefs.expiry_buffer(),
                Err(crate::error::Error::Config(ConfigError::Invalid(_)))
            ));
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let config = Config {
            api_host: Some("https://hub.example".to_string()),
            username: Some("alice".to_string()),
            session: SessionPreferences::default(),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_host.as_deref(), Some("https://hub.example"));
        assert_eq!(loaded.username.as_deref(), Some("alice"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        Config::default().save_to(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_api_host_precedence() {
        let mut config = Config::default();
        assert_eq!(config.api_host(None), DEFAULT_API_HOST);

        config.api_host = Some("https://hub.example/".to_string());
        assert_eq!(config.api_host(None), "https://hub.example");
        assert_eq!(
            config.api_host(Some("http://127.0.0.1:9000")),
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn test_sibling_paths() {
        let config_path = Path::new("/tmp/boinchub/config.yaml");
        assert_eq!(
            Config::session_path(config_path),
            PathBuf::from("/tmp/boinchub/session.yaml")
        );
        assert_eq!(
            Config::cookie_path(config_path),
            PathBuf::from("/tmp/boinchub/cookies.yaml")
        );
    }
}
