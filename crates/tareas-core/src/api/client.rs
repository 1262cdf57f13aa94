//! API client for communicating with the tareas REST API.
//!
//! `ApiClient::send` is the interceptor chain: it attaches the stored access
//! token, and on a 401 runs the one-shot refresh protocol before replaying
//! the request. The typed endpoint methods below are thin wrappers over it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::storage::{TokenStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::models::password::PasswordCheck;
use crate::models::{
    NewTask, NewUser, PasswordRequirements, PasswordStrength, PasswordValidation, RefreshedToken,
    Task, TaskPage, TaskQuery, TaskUpdate, TokenPair, User,
};

use super::error::parse_retry_after;
use super::request::{PendingRequest, RequestBody};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const REFRESH_PATH: &str = "/refresh";

/// Host hook fired when the session cannot be recovered and the user must
/// log in again.
pub trait LoginRedirect: Send + Sync {
    fn login_required(&self);
}

/// Default hook: only records the event in the log
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn login_required(&self) {
        warn!("Session expired - login required");
    }
}

/// API client for the tareas backend.
/// Clone is cheap - the reqwest client, storage and refresh lock are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    storage: Arc<dyn TokenStorage>,
    redirect: Arc<dyn LoginRedirect>,
    // Held while a refresh is in flight so concurrent 401s share one refresh
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client for `base_url` backed by `storage`
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn TokenStorage>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
            redirect: Arc::new(LogRedirect),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Replace the hook fired on unrecoverable refresh failure
    #[must_use]
    pub fn with_login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    // ===== Token Storage =====

    fn read_token(&self, key: &str) -> Result<Option<String>, ApiError> {
        self.storage
            .get(key)
            .map(|token| token.filter(|t| !t.is_empty()))
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))
    }

    pub fn access_token(&self) -> Result<Option<String>, ApiError> {
        self.read_token(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, ApiError> {
        self.read_token(REFRESH_TOKEN_KEY)
    }

    /// Persist a freshly issued credential pair
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        self.storage
            .set(ACCESS_TOKEN_KEY, &tokens.access_token)
            .and_then(|_| self.storage.set(REFRESH_TOKEN_KEY, &tokens.refresh_token))
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))
    }

    /// Remove both tokens. Both removals are attempted even if the first fails.
    pub fn clear_tokens(&self) -> Result<(), ApiError> {
        let access = self.storage.remove(ACCESS_TOKEN_KEY);
        let refresh = self.storage.remove(REFRESH_TOKEN_KEY);
        access
            .and(refresh)
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))
    }

    // ===== Interceptor Chain =====

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(&self, request: &PendingRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
        };

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = token.is_some(),
            retried = request.retried,
            "Sending request"
        );

        Ok(builder.send().await?)
    }

    /// Send a request with the stored credential attached.
    ///
    /// The response is returned as is, whatever its status, except for a 401
    /// on a request not yet marked retried: then the access token is
    /// refreshed once and the request is replayed with the new token. If no
    /// refresh token is stored the original 401 response is returned. If the
    /// refresh itself fails, or its new access token cannot be stored, both
    /// tokens are cleared, the login redirect hook fires, and
    /// `ApiError::RefreshFailed` is returned.
    pub async fn send(&self, mut request: PendingRequest) -> Result<Response, ApiError> {
        let access = self.access_token()?;
        let response = self.execute(&request, access.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.retried {
            return Ok(response);
        }

        request.retried = true;

        if self.refresh_token()?.is_none() {
            debug!(path = %request.path, "401 with no refresh token stored");
            return Ok(response);
        }

        warn!(path = %request.path, "Access token rejected, refreshing");
        let new_access = self.refresh_access_token(access.as_deref()).await?;
        self.execute(&request, Some(&new_access)).await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// `stale` is the access token the failed request was sent with. If the
    /// stored token differs once the refresh lock is held, another request
    /// already refreshed and that token is reused.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.access_token()? {
            if stale != Some(current.as_str()) {
                debug!("Access token already refreshed by another request");
                return Ok(current);
            }
        }

        let refresh_token = match self.refresh_token()? {
            Some(token) => token,
            None => {
                // Cleared by a concurrent failed refresh, which already redirected
                return Err(ApiError::RefreshFailed("session ended".to_string()));
            }
        };

        // A new token that cannot be stored is treated like a failed refresh
        let refreshed = match self.request_refresh(&refresh_token).await {
            Ok(token) => self
                .storage
                .set(ACCESS_TOKEN_KEY, &token.access_token)
                .map(|_| token.access_token)
                .map_err(|e| ApiError::Storage(format!("{:#}", e))),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(access_token) => {
                info!("Access token refreshed");
                Ok(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                if let Err(clear_err) = self.clear_tokens() {
                    warn!(error = %clear_err, "Failed to clear stored tokens");
                }
                self.redirect.login_required();
                Err(ApiError::RefreshFailed(e.to_string()))
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshedToken, ApiError> {
        let request = PendingRequest::post(REFRESH_PATH)
            .json(&serde_json::json!({ "token": refresh_token }))?
            .without_refresh();
        let response = self.execute(&request, None).await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, REFRESH_PATH).await
    }

    // ===== Response Handling =====

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body, retry_after))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Send and decode a JSON response body
    pub async fn request_json<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, &path).await
    }

    /// Send and discard the response body
    pub async fn request_empty(&self, request: PendingRequest) -> Result<(), ApiError> {
        let response = self.send(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(PendingRequest::get(path)).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_json(PendingRequest::post(path).json(body)?).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request_json(PendingRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request_empty(PendingRequest::delete(path)).await
    }

    // ===== Authentication Endpoints =====

    /// Exchange username and password for a credential pair.
    /// The tokens are returned, not stored.
    pub async fn exchange_credentials(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = PendingRequest::post("/token")
            .form(&[("username", username), ("password", password)])
            .without_refresh();
        self.request_json(request).await
    }

    pub async fn register(&self, user: &NewUser) -> Result<User, ApiError> {
        self.post_json("/register", user).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("/me").await
    }

    /// Revoke one refresh token on the server
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<(), ApiError> {
        let request = PendingRequest::post("/logout").json(&serde_json::json!({ "token": refresh_token }))?;
        self.request_empty(request).await
    }

    /// Revoke every session of the current user
    pub async fn revoke_all_sessions(&self) -> Result<(), ApiError> {
        self.request_empty(PendingRequest::post("/logout/all")).await
    }

    // ===== Task Endpoints =====

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ApiError> {
        self.request_json(PendingRequest::get("/tareas").query(query.to_pairs()))
            .await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.get_json(&format!("/tareas/{}", id)).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.post_json("/tareas", task).await
    }

    pub async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.put_json(&format!("/tareas/{}", id), update).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/tareas/{}", id)).await
    }

    // ===== Password Endpoints =====

    pub async fn password_requirements(&self) -> Result<PasswordRequirements, ApiError> {
        self.get_json("/password/requirements").await
    }

    pub async fn check_password_strength(&self, password: &str) -> Result<PasswordStrength, ApiError> {
        self.post_json("/password/check-strength", &PasswordCheck { password })
            .await
    }

    pub async fn validate_password(&self, password: &str) -> Result<PasswordValidation, ApiError> {
        self.post_json("/password/validate", &PasswordCheck { password })
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
