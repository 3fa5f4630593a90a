//! Request middleware chain
//!
//! Every authenticated request flows through an explicit, ordered list of
//! [`Middleware`] stages before reaching the [`HttpTransport`]. The standard
//! chain built by [`Pipeline::authenticated`] is:
//!
//! 1. [`RequestLogger`] - debug line per request with status and latency
//! 2. [`ExpiryRefresh`] - refresh a token that is inside the expiry buffer
//! 3. [`Authorize`] - attach the current bearer token
//! 4. [`UnauthorizedRetry`] - on 401, refresh once and replay the request
//!
//! The login, refresh and logout exchanges never pass through this chain.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::debug;
use reqwest::{Response, StatusCode};

use super::transport::{ApiRequest, HttpTransport};
use crate::error::Result;
use crate::session::SessionManager;

/// One stage of the request pipeline
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle a request, delegating to `next` for the rest of the chain
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response>;
}

/// The remainder of the chain after the current stage.
///
/// `Next` is `Copy`, so a stage may run the rest of the chain more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a HttpTransport,
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(transport: &'a HttpTransport, stages: &'a [Arc<dyn Middleware>]) -> Self {
        Self { transport, stages }
    }

    /// Run the remaining stages, ending at the transport
    pub async fn run(self, request: ApiRequest) -> Result<Response> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(request, Next::new(self.transport, rest))
                    .await
            }
            None => self.transport.send(&request).await,
        }
    }
}

/// Ordered middleware stages in front of a transport
pub struct Pipeline {
    transport: HttpTransport,
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Pipeline with no stages
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            stages: Vec::new(),
        }
    }

    /// Append a stage; stages run in the order they are added
    pub fn with(mut self, stage: impl Middleware + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// The standard chain for requests made on behalf of a session
    pub fn authenticated(session: &SessionManager, proactive_refresh: bool) -> Self {
        let mut pipeline = Self::new(session.transport().clone()).with(RequestLogger);
        if proactive_refresh {
            pipeline = pipeline.with(ExpiryRefresh::new(session.clone()));
        }
        pipeline
            .with(Authorize::new(session.clone()))
            .with(UnauthorizedRetry::new(session.clone()))
    }

    /// Send a request through every stage
    pub async fn execute(&self, request: ApiRequest) -> Result<Response> {
        Next::new(&self.transport, &self.stages).run(request).await
    }
}

/// Logs each request with its outcome
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response> {
        let method = request.method.clone();
        let path = request.path.clone();
        let started = Instant::now();

        let result = next.run(request).await;
        match &result {
            Ok(response) => debug!(
                "{} {} -> {} ({} ms)",
                method,
                path,
                response.status(),
                started.elapsed().as_millis()
            ),
            Err(e) => debug!("{} {} failed: {}", method, path, e),
        }
        result
    }
}

/// Refreshes an expiring token before the request goes out
pub struct ExpiryRefresh {
    session: SessionManager,
}

impl ExpiryRefresh {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for ExpiryRefresh {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response> {
        self.session.ensure_fresh().await?;
        next.run(request).await
    }
}

/// Attaches the session's bearer token
pub struct Authorize {
    session: SessionManager,
}

impl Authorize {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for Authorize {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response> {
        next.run(self.session.authorize(request)).await
    }
}

/// Hands a 401 to the session manager for a single refresh-and-replay
pub struct UnauthorizedRetry {
    session: SessionManager,
}

impl UnauthorizedRetry {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for UnauthorizedRetry {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response> {
        let response = next.run(request.clone()).await?;

        // A replayed request that is rejected again is final
        if response.status() != StatusCode::UNAUTHORIZED || request.retried {
            return Ok(response);
        }

        self.session.handle_unauthorized(request, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Stage that appends its name to the request path and counts calls
    struct Tag {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut request = request;
            request.path = format!("{}/{}", request.path, self.name);
            next.run(request).await
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_order_before_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/projects/outer/inner")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let transport = HttpTransport::new(&server.url(), Duration::from_secs(5)).unwrap();
        let pipeline = Pipeline::new(transport)
            .with(Tag {
                name: "outer",
                calls: calls.clone(),
            })
            .with(Tag {
                name: "inner",
                calls: calls.clone(),
            });

        let response = pipeline
            .execute(ApiRequest::get("/api/v1/projects"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_plain_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/health")
            .with_status(200)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), Duration::from_secs(5)).unwrap();
        let pipeline = Pipeline::new(transport).with(RequestLogger);
        pipeline
            .execute(ApiRequest::get("/api/v1/health"))
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
