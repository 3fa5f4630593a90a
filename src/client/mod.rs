//! BoincHub API client

use async_trait::async_trait;

use crate::error::Result;

pub mod boinchub;
pub mod middleware;
pub mod models;
pub mod response;
pub mod transport;

pub use boinchub::BoincHubClient;
pub use middleware::{Middleware, Next, Pipeline};
pub use models::{MessageResponse, RegisterRequest, Role, User, UserSession};
pub use transport::{ApiRequest, HttpTransport};

/// Account operations exposed by the BoincHub backend
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Identity of the authenticated user.
    ///
    /// Any failure discards the local session.
    async fn current_user(&self) -> Result<User>;

    /// Create a new account (public endpoint)
    async fn register(&self, request: &RegisterRequest) -> Result<User>;

    /// Sessions belonging to the current user
    async fn list_sessions(&self) -> Result<Vec<UserSession>>;

    /// Revoke one session by ID
    async fn revoke_session(&self, session_id: &str) -> Result<()>;

    /// Revoke every session except the current one, returning the server message
    async fn logout_all(&self) -> Result<String>;
}
