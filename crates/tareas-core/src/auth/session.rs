use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{NewUser, User};

/// Login, registration and logout on top of the API client's token storage
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// An access token is stored. Says nothing about whether it is still valid.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.api.access_token(), Ok(Some(_)))
    }

    /// Exchange credentials for tokens, store them, and load the profile
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.api.exchange_credentials(email, password).await?;
        self.api.store_tokens(&tokens)?;
        let user = self.api.current_user().await?;
        info!(user_id = user.id, "Login successful");
        Ok(user)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let user = self.api.register(&new_user).await?;
        info!(user_id = user.id, "Account registered");
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.api.current_user().await
    }

    /// Revoke this session's refresh token and clear local tokens.
    /// Local tokens are cleared even if the server call fails; that failure is returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let revoke = match self.api.refresh_token()? {
            Some(refresh_token) => self.api.revoke_refresh_token(&refresh_token).await,
            None => Ok(()),
        };
        if let Err(ref e) = revoke {
            warn!(error = %e, "Failed to revoke refresh token");
        }
        self.api.clear_tokens()?;
        info!("Logged out");
        revoke
    }

    /// Revoke every session of the user and clear local tokens.
    /// Local tokens are cleared even if the server call fails; that failure is returned.
    pub async fn logout_all(&self) -> Result<(), ApiError> {
        let revoke = self.api.revoke_all_sessions().await;
        if let Err(ref e) = revoke {
            warn!(error = %e, "Failed to revoke all sessions");
        }
        self.api.clear_tokens()?;
        info!("Logged out of all sessions");
        revoke
    }

    /// Check a stored session on startup.
    ///
    /// Returns the user when the session is usable, `None` when there is no
    /// session. An authorization failure clears the tokens; other errors
    /// (network, server) are returned and leave the tokens in place.
    pub async fn restore(&self) -> Result<Option<User>, ApiError> {
        if self.api.access_token()?.is_none() {
            debug!("No stored session");
            return Ok(None);
        }

        match self.api.current_user().await {
            Ok(user) => {
                debug!(user_id = user.id, "Session restored");
                Ok(Some(user))
            }
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Stored session rejected");
                self.api.clear_tokens()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::storage::{MemoryStorage, TokenStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

    fn user_json() -> serde_json::Value {
        json!({
            "id": 3,
            "email": "ana@example.com",
            "username": "ana",
            "is_active": true,
            "created_at": "2024-01-01T12:00:00"
        })
    }

    fn service_for(server: &MockServer) -> (AuthService, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let api = ApiClient::new(server.uri(), storage.clone()).unwrap();
        (AuthService::new(api), storage)
    }

    #[tokio::test]
    async fn test_login_stores_both_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a1",
                "refresh_token": "r1",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        assert!(!auth.is_logged_in());

        let user = auth.login("ana@example.com", "S3gura!Clave").await.unwrap();
        assert_eq!(user.id, 3);
        assert!(auth.is_logged_in());
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_failed_login_stores_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Credenciales incorrectas"})),
            )
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        let err = auth.login("ana@example.com", "mal").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_surfaces_validation_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "El email ya está registrado"})),
            )
            .mount(&server)
            .await;

        let (auth, _) = service_for(&server);
        let err = auth
            .register("ana", "ana@example.com", "S3gura!Clave")
            .await
            .unwrap_err();
        assert_eq!(err.detail(), Some("El email ya está registrado"));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .and(body_json(json!({"token": "r1"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();

        auth.logout().await.unwrap();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_all_clears_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout/all"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();

        assert!(auth.logout_all().await.is_err());
        assert!(!auth.is_logged_in());
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_without_session() {
        let server = MockServer::start().await;
        let (auth, _) = service_for(&server);
        assert!(auth.restore().await.unwrap().is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_clears_rejected_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();

        assert!(auth.restore().await.unwrap().is_none());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_keeps_session_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let (auth, storage) = service_for(&server);
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();

        assert!(auth.restore().await.is_err());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a1"));
    }
}
