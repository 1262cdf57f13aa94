use serde::{Deserialize, Serialize};

use super::format_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn member_since(&self) -> String {
        format_timestamp(&self.created_at)
    }

    pub fn last_login_display(&self) -> String {
        self.last_login
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string())
    }
}

/// Registration payload for `POST /register`
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response of `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response of `POST /refresh`.
/// Only the access token is required; the server may echo the refresh token back.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user() {
        let json = r#"{"id": 7, "email": "ana@example.com", "username": "ana", "is_active": true, "created_at": "2024-01-01T12:00:00", "last_login": null}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "ana");
        assert_eq!(user.member_since(), "Jan 01, 2024 12:00");
        assert_eq!(user.last_login_display(), "never");
    }

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let token: RefreshedToken =
            serde_json::from_str(r#"{"access_token": "abc"}"#).expect("Failed to parse token");
        assert_eq!(token.access_token, "abc");
        assert!(token.refresh_token.is_none());
    }
}
