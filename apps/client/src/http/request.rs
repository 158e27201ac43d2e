use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::http::transport::TransportError;

/// Refresh endpoint. Requests to it bypass the session pipeline entirely.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Request payload. Kept in replayable form so a refresh-triggered retry
/// resubmits exactly the same request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        field: String,
        file_name: String,
        mime: String,
        bytes: Bytes,
    },
}

/// One logical outbound call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Query string pairs, kept out of `path` so routing and logs see the bare path.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// One-shot flag: set once the single refresh-triggered retry has been spent.
    pub retried: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
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

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn multipart(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        };
        self
    }

    pub fn is_refresh(&self) -> bool {
        self.path == REFRESH_PATH
    }

    /// The bearer credential currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub fn set_bearer(&mut self, token: &str) -> Result<(), TransportError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            TransportError::InvalidRequest("credential is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_request_is_not_retried() {
        let request = OutboundRequest::get("/resumes/history");
        assert!(!request.retried);
        assert_eq!(request.body, RequestBody::Empty);
        assert!(request.bearer().is_none());
    }

    #[test]
    fn test_set_bearer_replaces_previous_credential() {
        let mut request = OutboundRequest::get("/resumes/history");
        request.set_bearer("old").unwrap();
        request.set_bearer("new").unwrap();
        assert_eq!(request.bearer(), Some("new"));
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_set_bearer_rejects_control_characters() {
        let mut request = OutboundRequest::get("/resumes/history");
        assert!(request.set_bearer("bad\ntoken").is_err());
    }

    #[test]
    fn test_query_does_not_change_path() {
        let request = OutboundRequest::post(REFRESH_PATH).query("refresh_token", "r1");
        assert!(request.is_refresh());
        assert_eq!(
            request.query,
            vec![("refresh_token".to_string(), "r1".to_string())]
        );
    }

    #[test]
    fn test_is_refresh_matches_exact_path() {
        assert!(OutboundRequest::post(REFRESH_PATH).is_refresh());
        assert!(!OutboundRequest::post("/auth/refresh-other").is_refresh());
    }

    #[test]
    fn test_json_body_is_captured() {
        let request = OutboundRequest::post("/jobs/analyze")
            .json(&json!({"content": "Rust engineer"}))
            .unwrap();
        assert_eq!(
            request.body,
            RequestBody::Json(json!({"content": "Rust engineer"}))
        );
    }

    #[test]
    fn test_response_json_and_text() {
        let response = ApiResponse::new(StatusCode::OK, r#"{"resume_id":"r1"}"#);
        let value: Value = response.json().unwrap();
        assert_eq!(value["resume_id"], "r1");
        assert!(response.text().contains("r1"));
        assert!(response.is_success());
    }
}
