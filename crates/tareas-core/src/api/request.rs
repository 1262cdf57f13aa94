use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
}

/// An outbound request, kept around so it can be replayed after a token refresh.
///
/// `retried` is set once the request has been through the refresh protocol;
/// a request carrying it is never refreshed again.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Mark the request as already through the refresh protocol
    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.retried = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_unretried() {
        let request = PendingRequest::get("/tareas");
        assert_eq!(request.method, Method::GET);
        assert!(!request.retried);
        assert_eq!(request.body, RequestBody::Empty);
        assert!(PendingRequest::post("/refresh").without_refresh().retried);
    }

    #[test]
    fn test_form_body() {
        let request = PendingRequest::post("/token").form(&[("username", "ana"), ("password", "pw")]);
        assert_eq!(
            request.body,
            RequestBody::Form(vec![
                ("username".to_string(), "ana".to_string()),
                ("password".to_string(), "pw".to_string()),
            ])
        );
    }

    #[test]
    fn test_clone_keeps_retry_marker_per_value() {
        let original = PendingRequest::get("/me");
        let mut replay = original.clone();
        replay.retried = true;
        assert!(!original.retried);
    }
}
