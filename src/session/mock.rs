//! Test doubles for the session manager's collaborators

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::navigator::Navigator;
use super::store::TokenStore;
use super::token::AccessToken;
use crate::error::{ConfigError, Result};

/// JSON body of a successful login/refresh response
pub fn token_body(token: &str, expires_in: i64) -> String {
    format!(
        r#"{{"access_token":"{}","token_type":"bearer","expires_in":{}}}"#,
        token, expires_in
    )
}

/// Navigator that records every redirect
pub struct RecordingNavigator {
    route: String,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Navigator currently on `route`
    pub fn at(route: &str) -> Arc<Self> {
        Arc::new(Self {
            route: route.to_string(),
            redirects: Mutex::new(Vec::new()),
        })
    }

    /// Routes redirected to, in order
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.route.clone()
    }

    fn redirect(&self, route: &str) {
        self.redirects.lock().unwrap().push(route.to_string());
    }
}

/// Volatile store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// In-memory token store that counts writes
#[derive(Default)]
pub struct CountingTokenStore {
    inner: MemoryTokenStore,
    saves: AtomicUsize,
    clears: AtomicUsize,
    fail_loads: AtomicBool,
    panic_on_save: AtomicBool,
}

impl CountingTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a token in place without counting it as a save
    pub fn seed(&self, token: AccessToken) {
        self.inner.save(&token).unwrap();
    }

    /// Make every subsequent load fail
    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent save panic, as a broken backend would
    pub fn panic_on_save(&self) {
        self.panic_on_save.store(true, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TokenStore for CountingTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ConfigError::ParseError("corrupt session file".to_string()).into());
        }
        self.inner.load()
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_save.load(Ordering::SeqCst) {
            panic!("session store failed while saving");
        }
        self.inner.save(token)
    }

    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(value: &str) -> AccessToken {
        AccessToken {
            token: value.to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    #[test]
    fn test_memory_store_replace_and_clear() {
        let store = MemoryTokenStore::default();
        assert!(store.load().unwrap().is_none());

        store.save(&token("first")).unwrap();
        store.save(&token("second")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().token, "second");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_counting_store_counts_writes() {
        let store = CountingTokenStore::new();
        store.seed(token("seeded"));
        store.save(&token("saved")).unwrap();
        store.clear().unwrap();

        assert_eq!(store.saves(), 1);
        assert_eq!(store.clears(), 1);
        assert!(store.load().unwrap().is_none());
    }
}
