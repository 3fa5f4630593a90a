//! Raw HTTP transport
//!
//! [`HttpTransport`] sends exactly the request it is given. It never attaches
//! credentials on its own and never retries, which makes it the bypass path
//! the session manager uses for the login, refresh and logout exchanges.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, SET_COOKIE};
use reqwest::{Client as HttpClient, Method, Response, Url};
use serde::{Deserialize, Serialize};

use crate::config::write_private;
use crate::error::{ApiError, ConfigError, Result};

/// Path prefix of the authentication endpoints; the refresh cookie is scoped to it
pub const AUTH_PATH_PREFIX: &str = "/api/v1/auth";

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A replayable API request.
///
/// Requests are plain data so the unauthorized-retry stage can send the same
/// request a second time with a new token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API host, e.g. `/api/v1/auth/me`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Bearer token attached by the authorize stage
    pub bearer: Option<String>,
    /// Session generation observed when the bearer token was attached
    pub generation: u64,
    /// Set once the request has been replayed after a refresh
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            generation: 0,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Attach a form-encoded body
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = Some(RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a bearer token explicitly
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Copy of this request for its single replay after a refresh
    pub fn retry_with(&self, token: &str) -> Self {
        let mut retry = self.clone();
        retry.bearer = Some(token.to_string());
        retry.retried = true;
        retry
    }
}

/// HTTP transport with a shared cookie jar
#[derive(Clone)]
pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
    cookies: Option<Arc<CookieVault>>,
}

impl HttpTransport {
    /// Create a transport whose cookies live only in memory
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::build(base_url, timeout, None)
    }

    /// Create a transport whose cookie jar is persisted to `path`
    pub fn with_cookie_file(base_url: &str, timeout: Duration, path: PathBuf) -> Result<Self> {
        Self::build(base_url, timeout, Some(path))
    }

    fn build(base_url: &str, timeout: Duration, cookie_path: Option<PathBuf>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let jar = Arc::new(Jar::default());

        let cookies = match cookie_path {
            Some(path) => Some(Arc::new(CookieVault::open(path, jar.clone(), &base_url)?)),
            None => None,
        };

        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_provider(jar)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            cookies,
        })
    }

    /// API host this transport talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request as-is
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await.map_err(ApiError::from)?;

        if response.headers().contains_key(SET_COOKIE) {
            if let Some(vault) = &self.cookies {
                if let Err(e) = vault.persist() {
                    log::warn!("Failed to persist cookies: {}", e);
                }
            }
        }

        Ok(response)
    }
}

/// On-disk copy of the cookies scoped to the authentication endpoints.
///
/// The refresh credential is an HTTP-only cookie; it is carried here so a
/// later CLI run can still refresh, but nothing outside the transport reads it.
struct CookieVault {
    path: PathBuf,
    jar: Arc<Jar>,
    scope: Url,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    cookies: Vec<String>,
}

impl CookieVault {
    fn open(path: PathBuf, jar: Arc<Jar>, base_url: &str) -> Result<Self> {
        let scope = Url::parse(&format!("{}{}/", base_url, AUTH_PATH_PREFIX))
            .map_err(|e| ConfigError::Invalid(format!("Invalid API host '{}': {}", base_url, e)))?;

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: CookieFile = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
            for pair in file.cookies {
                jar.add_cookie_str(&format!("{}; Path={}", pair, AUTH_PATH_PREFIX), &scope);
            }
        }

        Ok(Self { path, jar, scope })
    }

    fn persist(&self) -> Result<()> {
        let cookies: Vec<String> = self
            .jar
            .cookies(&self.scope)
            .and_then(|header| header.to_str().ok().map(str::to_string))
            .map(|header| header.split("; ").map(str::to_string).collect())
            .unwrap_or_default();

        if cookies.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let contents = serde_yaml::to_string(&CookieFile { cookies })
            .map_err(|e| ConfigError::SaveError(e.to_string()))?;
        write_private(&self.path, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::post("/api/v1/auth/login")
            .form(&[("username", "alice"), ("password", "secret")])
            .query("page", 2);

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.query, vec![("page".to_string(), "2".to_string())]);
        assert!(matches!(req.body, Some(RequestBody::Form(ref f)) if f.len() == 2));
        assert!(req.bearer.is_none());
        assert!(!req.retried);
    }

    #[test]
    fn test_retry_with_marks_request() {
        let req = ApiRequest::get("/api/v1/auth/me").bearer("old");
        let retry = req.retry_with("new");

        assert_eq!(retry.bearer.as_deref(), Some("new"));
        assert!(retry.retried);
        assert_eq!(req.bearer.as_deref(), Some("old"));
        assert!(!req.retried);
    }

    #[test]
    fn test_transport_trims_base_url() {
        let transport = HttpTransport::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_send_attaches_bearer_and_persists_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/login")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_header("set-cookie", "refresh_token=r1; Path=/api/v1/auth; HttpOnly")
            .with_body("{}")
            .create_async()
            .await;

        let temp = tempdir().unwrap();
        let cookie_path = temp.path().join("cookies.yaml");
        let transport =
            HttpTransport::with_cookie_file(&server.url(), Duration::from_secs(5), cookie_path.clone())
                .unwrap();

        let response = transport
            .send(&ApiRequest::post("/api/v1/auth/login").bearer("abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        mock.assert_async().await;

        let saved = std::fs::read_to_string(&cookie_path).unwrap();
        assert!(saved.contains("refresh_token=r1"));
    }

    #[tokio::test]
    async fn test_persisted_cookie_is_replayed_by_new_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/refresh")
            .match_header("cookie", "refresh_token=r1")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let temp = tempdir().unwrap();
        let cookie_path = temp.path().join("cookies.yaml");
        std::fs::write(&cookie_path, "cookies:\n  - refresh_token=r1\n").unwrap();

        let transport =
            HttpTransport::with_cookie_file(&server.url(), Duration::from_secs(5), cookie_path)
                .unwrap();
        transport
            .send(&ApiRequest::post("/api/v1/auth/refresh"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = transport
            .send(&ApiRequest::get("/api/v1/auth/me"))
            .await
            .unwrap_err();
        assert!(matches!(err.api(), Some(ApiError::Network(_))));
    }
}
