//! BoincHub API client implementation

use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use reqwest::Response;
use serde::de::DeserializeOwned;

use super::middleware::Pipeline;
use super::models::{MessageResponse, RegisterRequest, User, UserSession};
use super::response::decode;
use super::transport::ApiRequest;
use super::AccountApi;
use crate::error::Result;
use crate::session::SessionManager;

/// Current identity
pub const ME_PATH: &str = "/api/v1/auth/me";

/// Active sessions of the current user
pub const SESSIONS_PATH: &str = "/api/v1/auth/sessions";

/// Revoke every session except the current one
pub const LOGOUT_ALL_PATH: &str = "/api/v1/auth/logout-all";

/// Public self-registration
pub const REGISTER_PATH: &str = "/api/v1/users/register";

/// BoincHub API client.
///
/// Every request goes through the authenticated middleware chain of the
/// session it was created with.
pub struct BoincHubClient {
    session: SessionManager,
    pipeline: Pipeline,
}

impl BoincHubClient {
    /// Create a client on top of a session
    pub fn new(session: SessionManager, proactive_refresh: bool) -> Self {
        let pipeline = Pipeline::authenticated(&session, proactive_refresh);
        Self { session, pipeline }
    }

    /// The session this client authenticates with
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send an authenticated request and return the raw response
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        self.pipeline.execute(request).await
    }

    /// Send an authenticated request and parse the JSON body
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        decode(self.send(request).await?).await
    }

    /// Revoke several sessions concurrently, reporting each outcome
    pub async fn revoke_sessions(&self, session_ids: &[String]) -> Vec<(String, Result<()>)> {
        let outcomes = join_all(session_ids.iter().map(|id| self.revoke_session(id))).await;
        session_ids.iter().cloned().zip(outcomes).collect()
    }
}

#[async_trait]
impl AccountApi for BoincHubClient {
    async fn current_user(&self) -> Result<User> {
        match self.request(ApiRequest::get(ME_PATH)).await {
            Ok(user) => Ok(user),
            Err(e) => {
                debug!("Identity lookup failed, discarding local session: {}", e);
                self.session.discard();
                Err(e)
            }
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User> {
        // Registration is public; it goes straight to the transport
        let request = ApiRequest::post(REGISTER_PATH).json(serde_json::to_value(request)?);
        let response = self.session.transport().send(&request).await?;
        decode(response).await
    }

    async fn list_sessions(&self) -> Result<Vec<UserSession>> {
        self.request(ApiRequest::get(SESSIONS_PATH)).await
    }

    async fn revoke_session(&self, session_id: &str) -> Result<()> {
        let path = format!("{}/{}", SESSIONS_PATH, session_id);
        let _: MessageResponse = self.request(ApiRequest::delete(path)).await?;
        Ok(())
    }

    async fn logout_all(&self) -> Result<String> {
        let response: MessageResponse = self.request(ApiRequest::post(LOGOUT_ALL_PATH)).await?;
        Ok(response.message)
    }
}
