//! Persisted access-token storage

use std::path::PathBuf;

use crate::config::write_private;
use crate::error::{ConfigError, Result};

use super::token::AccessToken;

/// Where the current access token and its expiry are kept between runs.
///
/// Implementations are called from synchronous sections of the session
/// manager and must not block on the network.
pub trait TokenStore: Send + Sync {
    /// Load the stored token, if any
    fn load(&self) -> Result<Option<AccessToken>>;

    /// Replace the stored token
    fn save(&self, token: &AccessToken) -> Result<()>;

    /// Remove the stored token
    fn clear(&self) -> Result<()>;
}

/// YAML file store, written with owner-only permissions
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let token: AccessToken = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(Some(token))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        let contents =
            serde_yaml::to_string(token).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        write_private(&self.path, &contents)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn token(value: &str) -> AccessToken {
        AccessToken {
            token: value.to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = tempdir().unwrap();
        let store = FileTokenStore::new(temp.path().join("session.yaml"));
        assert!(store.load().unwrap().is_none());

        let saved = token("abc");
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = FileTokenStore::new(temp.path().join("session.yaml"));

        store.save(&token("abc")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.yaml");
        std::fs::write(&path, "token: [unclosed").unwrap();

        let store = FileTokenStore::new(path);
        assert!(store.load().is_err());
    }
}
