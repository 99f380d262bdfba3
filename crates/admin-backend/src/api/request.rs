use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use super::response::ApiError;

/// Description of one API call, resolved against the client's base URL
///
/// Cloned when the call is re-issued after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes any value as the JSON body
    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {e}")))?;
        Ok(self.with_body(value))
    }

    /// Adds a header override, replacing any default with the same name
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the body is sent on the wire
    ///
    /// GET and HEAD never carry a body, even when one was attached.
    pub fn sends_body(&self) -> bool {
        self.body.is_some() && self.method != Method::GET && self.method != Method::HEAD
    }
}
