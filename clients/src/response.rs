//! Raw HTTP response as seen by a test case

use crate::error::ClientError;
use notes_harness_core::models::ErrorBody;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// A fully read response.
///
/// The body is buffered so a case can look at it more than once: first as
/// text for the log, then as JSON for the assertion.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    /// Build a response from its parts.
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::BodyRead(e.to_string()))?
            .to_vec();

        tracing::debug!(
            status = status.as_u16(),
            body_bytes = body.len(),
            "Received response"
        );
        tracing::debug!(body = %String::from_utf8_lossy(&body), "Response body");

        Ok(Self::new(status, headers, body))
    }

    /// HTTP status code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `Content-Type` header, if present and valid UTF-8
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Raw body bytes
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ResponseParseFailed`] if the body is not valid
    /// JSON for `T`. The error carries the body text.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::ResponseParseFailed(format!(
                "{e} (status {}, body: {})",
                self.status.as_u16(),
                self.text()
            ))
        })
    }

    /// Decode the body as untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ResponseParseFailed`] if the body is not JSON
    pub fn json_value(&self) -> Result<serde_json::Value, ClientError> {
        self.json()
    }

    /// The `error` field of an error body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ResponseParseFailed`] if the body is not
    /// `{"error": "..."}`
    pub fn error_message(&self) -> Result<String, ClientError> {
        self.json::<ErrorBody>().map(|body| body.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(status: u16, body: &str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn error_message_reads_error_field() {
        let response = response(401, r#"{"error":"invalid token: no prefix Bearer"}"#);
        assert_eq!(
            response.error_message().unwrap(),
            "invalid token: no prefix Bearer"
        );
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn parse_failure_carries_body() {
        let response = response(500, "upstream exploded");
        let err = response.json_value().unwrap_err();
        assert!(err.to_string().contains("upstream exploded"));
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn text_is_lossy() {
        let response = ApiResponse::new(StatusCode::OK, HeaderMap::new(), vec![b'o', b'k', 0xff]);
        assert_eq!(response.text(), "ok\u{fffd}");
        assert!(response.content_type().is_none());
    }
}
