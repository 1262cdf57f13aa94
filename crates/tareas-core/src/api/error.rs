use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited {
        /// Delay requested by the server's `retry-after` header
        retry_after: Option<Duration>,
        detail: Option<String>,
    },

    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded { attempts: u32 },

    #[error("Request rejected ({status}): {detail}")]
    Validation { status: u16, detail: String },

    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human-readable `detail` field out of an error body.
    ///
    /// Validation failures carry `detail` as a list of objects with a `msg`
    /// field; those are joined.
    pub fn detail_from_body(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }

    pub fn from_status(
        status: reqwest::StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        let detail = Self::detail_from_body(body);
        let message = detail
            .clone()
            .unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited {
                retry_after,
                detail,
            },
            500..=599 => ApiError::Server {
                status: status.as_u16(),
                detail: message,
            },
            code => ApiError::Validation {
                status: code,
                detail: message,
            },
        }
    }

    /// HTTP status behind this error, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided detail message, if the error carries one
    pub fn detail(&self) -> Option<&str> {
        let detail = match self {
            ApiError::Unauthorized(d) | ApiError::AccessDenied(d) | ApiError::NotFound(d) => {
                Some(d.as_str())
            }
            ApiError::Validation { detail, .. } | ApiError::Server { detail, .. } => {
                Some(detail.as_str())
            }
            ApiError::RateLimited { detail, .. } => detail.as_deref(),
            _ => None,
        };
        detail.filter(|d| !d.is_empty())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::RefreshFailed(_))
    }
}

/// Parse a `retry-after` header given in whole seconds
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_detail() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "El título es obligatorio"}"#,
            None,
        );
        assert!(matches!(err, ApiError::Validation { status: 400, .. }));
        assert_eq!(err.detail(), Some("El título es obligatorio"));
    }

    #[test]
    fn test_from_status_joins_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "titulo"], "msg": "field required"}, {"msg": "too short"}]}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body, None);
        assert_eq!(err.detail(), Some("field required; too short"));
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_from_status_rate_limited() {
        let body = r#"{"detail": "Demasiadas solicitudes"}"#;
        let err = ApiError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            body,
            Some(Duration::from_secs(2)),
        );
        match err {
            ApiError::RateLimited { retry_after, detail } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
                assert_eq!(detail.as_deref(), Some("Demasiadas solicitudes"));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_server_error_without_json() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down", None);
        assert!(matches!(err, ApiError::Server { status: 502, .. }));
        assert_eq!(err.detail(), Some("upstream down"));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
