//! REST client for the thesis render backend.
//!
//! Wraps every endpoint the console consumes using [`reqwest`].  The
//! session lives in a cookie set by `POST /api/login`, so the underlying
//! client keeps a cookie store.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thesis_core::job::{HistoryRecord, Job};
use thesis_core::stats::Stats;
use thesis_core::sync::FetchFailure;
use thesis_core::user::{Credentials, Identity, NewUser, User};

/// HTTP client for one backend instance.
#[derive(Clone)]
pub struct ThesisApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ThesisApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Error body shape used by the backend (`{"error": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ThesisApiError {
    /// Classify the error for the reconciliation layer.
    pub fn classify(&self) -> FetchFailure {
        match self {
            ThesisApiError::Request(e) if e.is_decode() => FetchFailure::Malformed(e.to_string()),
            ThesisApiError::Request(e) => FetchFailure::Network(e.to_string()),
            ThesisApiError::ApiError { status: 401 | 403, .. } => FetchFailure::Unauthorized,
            ThesisApiError::ApiError { status, .. } => FetchFailure::Rejected { status: *status },
            ThesisApiError::Decode(msg) => FetchFailure::Malformed(msg.clone()),
        }
    }

    /// Whether the backend refused the session (401/403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ThesisApiError::ApiError { status: 401 | 403, .. })
    }

    /// The `error` field of a JSON error body, if the backend sent one.
    pub fn server_message(&self) -> Option<String> {
        match self {
            ThesisApiError::ApiError { body, .. } => serde_json::from_str::<ErrorBody>(body)
                .ok()
                .map(|b| b.error)
                .filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }
}

impl ThesisApi {
    /// Create a client for the backend at `base_url` with a per-request
    /// timeout and its own cookie jar.
    ///
    /// * `base_url` - e.g. `http://host:8080` (no trailing slash needed).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ThesisApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- session ----

    /// `POST /api/login`. On success the session cookie is stored.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ThesisApiError> {
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(credentials)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `POST /api/logout`.
    pub async fn logout(&self) -> Result<(), ThesisApiError> {
        let response = self.client.post(self.url("/api/logout")).send().await?;
        Self::check_status(response).await
    }

    /// `GET /api/whoami`.
    pub async fn whoami(&self) -> Result<Identity, ThesisApiError> {
        self.get_json("/api/whoami").await
    }

    // ---- reconciliation reads ----

    /// `GET /api/admin/stats`.
    pub async fn fetch_stats(&self) -> Result<Stats, ThesisApiError> {
        self.get_json("/api/admin/stats").await
    }

    /// `GET /api/admin/renders`. A `null` body is an empty list.
    pub async fn fetch_admin_renders(&self) -> Result<Vec<Job>, ThesisApiError> {
        let jobs: Option<Vec<Job>> = self.get_json("/api/admin/renders").await?;
        Ok(jobs.unwrap_or_default())
    }

    /// `GET /api/render-history`, converted to the common job model.
    pub async fn fetch_render_history(&self) -> Result<Vec<Job>, ThesisApiError> {
        let records: Option<Vec<HistoryRecord>> = self.get_json("/api/render-history").await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(Job::from)
            .collect())
    }

    /// `GET /api/admin/users`. A `null` body is an empty list.
    pub async fn fetch_users(&self) -> Result<Vec<User>, ThesisApiError> {
        let users: Option<Vec<User>> = self.get_json("/api/admin/users").await?;
        Ok(users.unwrap_or_default())
    }

    /// `GET /api/render-status?uid=`: the raw status document of one job.
    pub async fn render_status(&self, uid: &str) -> Result<serde_json::Value, ThesisApiError> {
        let response = self
            .client
            .get(self.url("/api/render-status"))
            .query(&[("uid", uid)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- moderation ----

    /// `POST /api/admin/users/create`.
    pub async fn create_user(&self, user: &NewUser) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/users/create", user).await
    }

    /// `POST /api/admin/users/block`.
    pub async fn block_user(&self, username: &str) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/users/block", &serde_json::json!({ "username": username }))
            .await
    }

    /// `POST /api/admin/users/unblock`.
    pub async fn unblock_user(&self, username: &str) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/users/unblock", &serde_json::json!({ "username": username }))
            .await
    }

    /// `POST /api/admin/users/delete`.
    pub async fn delete_user(&self, username: &str) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/users/delete", &serde_json::json!({ "username": username }))
            .await
    }

    /// `POST /api/admin/renders/restart`.
    pub async fn restart_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/renders/restart", &serde_json::json!({ "uid": uid }))
            .await
    }

    /// `POST /api/admin/renders/delete`.
    pub async fn delete_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        self.post_command("/api/admin/renders/delete", &serde_json::json!({ "uid": uid }))
            .await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ThesisApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_response(response).await
    }

    async fn post_command<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), ThesisApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::check_status(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ThesisApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ThesisApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ThesisApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ThesisApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ThesisApiError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ThesisApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
