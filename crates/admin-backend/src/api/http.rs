//! HTTP transport abstraction for the admin API
//!
//! This module provides a trait-based HTTP client that can be easily mocked for testing.
//! The transport only moves bytes: authentication, refresh and envelope
//! normalization live in [`ApiClient`](super::ApiClient).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;

use super::upload::FilePart;

/// Transport-level failure: the request never produced an HTTP response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self(format!("Connection failed: {err}"))
        } else if err.is_timeout() {
            Self(format!("Request timed out: {err}"))
        } else {
            Self(err.to_string())
        }
    }
}

/// Body of an outgoing request
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

/// Multipart form with text fields and streamed file parts
#[derive(Debug, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

/// A fully resolved request handed to the transport
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Trait for making HTTP requests
///
/// This abstraction allows easy mocking of HTTP calls in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the raw response
    ///
    /// Any HTTP status is a successful transport outcome; only failures to
    /// obtain a response at all are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Response from an HTTP request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Returns true if status is in 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if status is 401
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Deserializes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }

    /// Parses the body leniently: empty or malformed bodies become `{}`
    pub fn json_or_empty(&self) -> serde_json::Value {
        self.json()
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Best human-readable description of a failed response
    ///
    /// Prefers the server's `error`, `message` or JWT `msg` field, then the
    /// status reason.
    pub fn error_message(&self) -> String {
        if let Ok(serde_json::Value::Object(map)) = self.json::<serde_json::Value>() {
            for key in ["error", "message", "msg"] {
                if let Some(serde_json::Value::String(msg)) = map.get(key) {
                    if !msg.is_empty() {
                        return msg.clone();
                    }
                }
            }
        }

        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map_or_else(|| format!("HTTP {}", self.status), str::to_string)
    }
}

/// Production HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new reqwest-based HTTP client
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Creates a client whose connections give up after `connect_timeout`
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { inner })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method, &request.url)
            .headers(request.headers);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| TransportError(format!("Failed to encode body: {e}")))?;
                builder.body(bytes)
            }
            RequestBody::Multipart(multipart) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in multipart.fields {
                    form = form.text(name, value);
                }
                for file in multipart.files {
                    let field = file.field.clone();
                    form = form.part(field, file.into_part()?);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
