//! Session management
//!
//! [`SessionManager`] owns the access token for the current session. It logs
//! in and out, decorates outgoing requests with the bearer token, and turns
//! a 401 into at most one refresh exchange no matter how many requests hit
//! the 401 at the same time.
//!
//! The manager is a cheap-to-clone handle around a single shared instance;
//! every request-issuing call site holds a clone of the same handle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use reqwest::{Response, StatusCode};

use crate::client::response::decode;
use crate::client::{ApiRequest, HttpTransport, Next};
use crate::error::{ApiError, Result};

#[cfg(test)]
pub mod mock;
pub mod navigator;
pub mod refresh;
pub mod store;
pub mod token;

pub use navigator::{CliNavigator, LOGIN_ROUTE, Navigator, is_public_route};
pub use refresh::{RefreshGate, RefreshOutcome, Waiter};
pub use store::{FileTokenStore, TokenStore};
pub use token::{AccessToken, TokenResponse};

/// Credential exchange endpoint (form-encoded username/password)
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Token refresh endpoint; authenticated by the refresh cookie
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Refresh-credential invalidation endpoint
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token stored
    Anonymous,
    /// A login exchange is in flight
    Authenticating,
    /// A token is stored
    Authenticated,
    /// A refresh exchange is in flight
    Refreshing,
}

/// Handle to the session's token lifecycle
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    transport: HttpTransport,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    slot: RwLock<TokenSlot>,
    gate: RefreshGate,
    logins_in_flight: AtomicUsize,
    expiry_buffer: Duration,
}

/// The stored token plus a counter bumped on every replacement or removal
#[derive(Debug, Default)]
struct TokenSlot {
    token: Option<AccessToken>,
    generation: u64,
}

/// What a caller that needs a new token should do
enum Ticket {
    /// The session already moved on to a usable token
    Reuse(AccessToken),
    /// The session ended after the caller's request went out
    Expired,
    /// Another caller is refreshing; wait for its outcome
    Wait(Waiter),
    /// Run the refresh exchange, started from this generation
    Refresh(Waiter, u64),
}

impl SessionManager {
    /// Create a session manager.
    ///
    /// `transport` is used directly for the login, refresh and logout
    /// exchanges, bypassing any middleware. A token already in `store` is
    /// picked up as the current token.
    pub fn new(
        transport: HttpTransport,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        expiry_buffer: Duration,
    ) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring unreadable session state: {}", e);
                None
            }
        };

        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                navigator,
                slot: RwLock::new(TokenSlot {
                    token,
                    generation: 0,
                }),
                gate: RefreshGate::new(),
                logins_in_flight: AtomicUsize::new(0),
                expiry_buffer,
            }),
        }
    }

    /// The transport the manager uses for its own exchanges
    pub fn transport(&self) -> &HttpTransport {
        &self.inner.transport
    }

    /// The stored token, live or not
    pub fn current_token(&self) -> Option<AccessToken> {
        self.read_slot().token.clone()
    }

    /// Expiry of the stored token
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read_slot().token.as_ref().map(|t| t.expires_at)
    }

    /// True iff a token is stored and it is not within the expiry buffer
    pub fn is_authenticated(&self) -> bool {
        self.read_slot()
            .token
            .as_ref()
            .is_some_and(|t| t.is_live(self.inner.expiry_buffer))
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        if self.inner.gate.in_flight() {
            SessionState::Refreshing
        } else if self.inner.logins_in_flight.load(Ordering::SeqCst) > 0 {
            SessionState::Authenticating
        } else if self.read_slot().token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Exchange credentials for an access token.
    ///
    /// On failure nothing is stored and any previously stored token is left
    /// untouched. A 401 from the backend is reported as
    /// [`ApiError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken> {
        self.inner.logins_in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = LoginInFlight(&self.inner.logins_in_flight);

        let request =
            ApiRequest::post(LOGIN_PATH).form(&[("username", username), ("password", password)]);
        let response = self.inner.transport.send(&request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidCredentials.into());
        }

        let body: TokenResponse = decode(response).await?;
        let token = AccessToken::from_response(body, Utc::now())?;

        {
            let mut slot = self.write_slot();
            self.replace(&mut slot, Some(token.clone()));
        }

        info!("Logged in as {}", username);
        Ok(token)
    }

    /// End the session.
    ///
    /// The backend is asked to invalidate the refresh credential; any failure
    /// there is logged and ignored. The local token is always cleared.
    pub async fn logout(&self) {
        let mut request = ApiRequest::post(LOGOUT_PATH);
        if let Some(token) = self.current_token() {
            request = request.bearer(token.token);
        }

        match self.inner.transport.send(&request).await {
            Ok(response) if response.status().is_success() => {
                debug!("Backend session invalidated")
            }
            Ok(response) => warn!("Logout rejected by backend: {}", response.status()),
            Err(e) => warn!("Logout request failed: {}", e),
        }

        self.discard();
        info!("Logged out");
    }

    /// Clear the local token without contacting the backend
    pub fn discard(&self) {
        let mut slot = self.write_slot();
        if slot.token.is_some() {
            self.replace(&mut slot, None);
        }
    }

    /// Attach the current bearer token, if any, to an outgoing request.
    ///
    /// Also stamps the request with the session generation so a later 401
    /// can tell whether the session has moved on since it was sent. An
    /// explicitly set bearer token is kept. Never touches the network.
    pub fn authorize(&self, mut request: ApiRequest) -> ApiRequest {
        let slot = self.read_slot();
        request.generation = slot.generation;
        if request.bearer.is_none() {
            request.bearer = slot.token.as_ref().map(|t| t.token.clone());
        }
        request
    }

    /// Refresh-and-replay for a request that came back 401.
    ///
    /// A request that has already been replayed once is not refreshed for
    /// again; it fails with [`ApiError::Unauthorized`]. If the refresh fails
    /// the session is over and the caller gets [`ApiError::SessionExpired`].
    pub async fn handle_unauthorized(&self, failed: ApiRequest, next: Next<'_>) -> Result<Response> {
        if failed.retried {
            return Err(ApiError::Unauthorized.into());
        }

        let token = self.refreshed_token(failed.generation).await?;
        debug!("Replaying {} {} with refreshed token", failed.method, failed.path);
        next.run(failed.retry_with(&token.token)).await
    }

    /// Obtain a new access token, joining a refresh already in flight
    pub async fn refresh(&self) -> Result<AccessToken> {
        let generation = self.read_slot().generation;
        self.refreshed_token(generation).await
    }

    /// Refresh a stored token that has entered the expiry buffer.
    ///
    /// Does nothing when no token is stored or the token is still live.
    pub async fn ensure_fresh(&self) -> Result<()> {
        let generation = {
            let slot = self.read_slot();
            match &slot.token {
                Some(token) if !token.is_live(self.inner.expiry_buffer) => slot.generation,
                _ => return Ok(()),
            }
        };

        debug!("Access token is expiring; refreshing before request");
        self.refreshed_token(generation).await.map(|_| ())
    }

    /// Decide, atomically with respect to other callers, how to get a token
    fn ticket(&self, observed: u64) -> Ticket {
        let mut gate = self.inner.gate.lock();
        if gate.in_flight() {
            return Ticket::Wait(gate.enqueue());
        }

        let slot = self.read_slot();
        if slot.generation != observed {
            match &slot.token {
                Some(token) if token.is_live(self.inner.expiry_buffer) => {
                    return Ticket::Reuse(token.clone());
                }
                None => return Ticket::Expired,
                Some(_) => {}
            }
        }

        gate.begin();
        Ticket::Refresh(gate.enqueue(), slot.generation)
    }

    async fn refreshed_token(&self, observed: u64) -> Result<AccessToken> {
        let waiter = match self.ticket(observed) {
            Ticket::Reuse(token) => {
                debug!("Session already holds a newer token");
                return Ok(token);
            }
            Ticket::Expired => return Err(ApiError::SessionExpired.into()),
            Ticket::Wait(waiter) => {
                debug!("Refresh in flight; waiting for its outcome");
                waiter
            }
            Ticket::Refresh(waiter, generation) => {
                debug!("Starting token refresh");
                // Runs to completion even if this caller stops waiting
                tokio::spawn(self.clone().run_refresh(generation));
                waiter
            }
        };

        match waiter.await {
            Ok(Some(token)) => Ok(token),
            _ => Err(ApiError::SessionExpired.into()),
        }
    }

    async fn run_refresh(self, generation: u64) {
        let guard = SettleOnDrop {
            session: &self,
            generation,
            done: false,
        };

        let outcome = match self.exchange_refresh().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                None
            }
        };

        guard.settle(outcome);
    }

    async fn exchange_refresh(&self) -> Result<AccessToken> {
        let response = self
            .inner
            .transport
            .send(&ApiRequest::post(REFRESH_PATH))
            .await?;
        let body: TokenResponse = decode(response).await?;
        AccessToken::from_response(body, Utc::now())
    }

    /// Store or clear, then release every waiter with the same outcome
    fn settle_refresh(&self, generation: u64, outcome: RefreshOutcome) {
        let (released_with, terminal) = {
            let mut slot = self.write_slot();
            if slot.generation != generation {
                // A login or logout landed mid-exchange; it takes precedence
                debug!("Session changed during refresh; keeping newer state");
                (slot.token.clone(), false)
            } else {
                let terminal = outcome.is_none();
                self.replace(&mut slot, outcome.clone());
                (outcome, terminal)
            }
        };

        if terminal {
            self.redirect_to_login();
        }

        let released = self.inner.gate.settle(released_with);
        debug!("Refresh settled; released {} waiting request(s)", released);
    }

    /// Release the waiters of an exchange that was cancelled mid-flight.
    ///
    /// The stored token and generation stay as they were, so the next 401
    /// starts a new exchange.
    fn abandon_refresh(&self) {
        let released = self.inner.gate.settle(None);
        debug!("Refresh cancelled; released {} waiting request(s)", released);
    }

    fn redirect_to_login(&self) {
        let route = self.inner.navigator.current_route();
        if is_public_route(&route) {
            debug!("Already on public route {}; not redirecting", route);
        } else {
            self.inner.navigator.redirect(LOGIN_ROUTE);
        }
    }

    /// Swap the stored token and persist it. Callers hold the slot lock.
    fn replace(&self, slot: &mut TokenSlot, token: Option<AccessToken>) {
        let persisted = match &token {
            Some(token) => self.inner.store.save(token),
            None => self.inner.store.clear(),
        };
        if let Err(e) = persisted {
            warn!("Failed to persist session state: {}", e);
        }

        slot.token = token;
        slot.generation += 1;
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, TokenSlot> {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, TokenSlot> {
        self.inner.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps `Authenticating` accurate even if a login future is dropped
struct LoginInFlight<'a>(&'a AtomicUsize);

impl Drop for LoginInFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Settles the refresh gate if the refresh task ends without an outcome.
///
/// A panic counts as a failed refresh. A cancelled task only releases the
/// waiters and leaves the stored token for the next exchange.
struct SettleOnDrop<'a> {
    session: &'a SessionManager,
    generation: u64,
    done: bool,
}

impl SettleOnDrop<'_> {
    fn settle(mut self, outcome: RefreshOutcome) {
        self.session.settle_refresh(self.generation, outcome);
        self.done = true;
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if std::thread::panicking() {
            warn!("Refresh task panicked; ending the session");
            self.session.settle_refresh(self.generation, None);
        } else {
            self.session.abandon_refresh();
        }
    }
}
