use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use super::http::{HttpResponse, TransportError};

/// Why a call did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Authentication required - please log in again")]
    AuthenticationRequired,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response payload: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.0)
    }
}

/// Normalized outcome of every client call
///
/// Transport, HTTP and authentication failures all land here instead of
/// being returned as `Err`; check `success` before reading `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<ApiError>,
    /// Raw body of a 2xx response that was not JSON, such as a CSV export
    #[serde(skip)]
    pub text: Option<String>,
}

fn serialize_error<S: Serializer>(error: &Option<ApiError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ApiResponse {
    pub fn ok(status: u16, data: serde_json::Value) -> Self {
        Self {
            success: true,
            status: Some(status),
            data: Some(data),
            error: None,
            text: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        let status = match error {
            ApiError::Http { status, .. } => Some(status),
            ApiError::AuthenticationRequired => Some(401),
            _ => None,
        };
        Self {
            success: false,
            status,
            data: None,
            error: Some(error),
            text: None,
        }
    }

    /// Normalizes a non-401 HTTP response
    pub(crate) fn from_http(response: &HttpResponse) -> Self {
        if response.is_success() {
            let mut envelope = Self::ok(response.status, response.json_or_empty());
            if response.json::<serde_json::Value>().is_err() && !response.body.trim().is_empty() {
                envelope.text = Some(response.body.clone());
            }
            envelope
        } else {
            Self::failure(ApiError::Http {
                status: response.status,
                message: response.error_message(),
            })
        }
    }

    /// The error as the string callers display
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// True when the session is gone and the caller should route to login
    pub fn requires_login(&self) -> bool {
        matches!(self.error, Some(ApiError::AuthenticationRequired))
    }

    /// Converts the envelope into a `Result` over the raw payload
    pub fn into_result(self) -> Result<serde_json::Value, ApiError> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data.unwrap_or(serde_json::Value::Null)),
            (false, Some(err)) => Err(err),
            (false, None) => Err(ApiError::Decode("failed response without error".to_string())),
        }
    }

    /// The body of a successful response as text
    ///
    /// Non-JSON bodies come back verbatim; JSON payloads are re-encoded.
    pub fn into_text(self) -> Result<String, ApiError> {
        match self {
            Self {
                success: true,
                text: Some(text),
                ..
            } => Ok(text),
            other => other.into_result().map(|value| value.to_string()),
        }
    }

    /// Decodes a successful payload into `T`
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = self.into_result()?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Decodes the field `key` of a successful payload into `T`
    ///
    /// Management endpoints wrap their data as `{"success": true, "<key>": ...}`.
    pub fn decode_field<T: DeserializeOwned>(self, key: &str) -> Result<T, ApiError> {
        let mut value = self.into_result()?;
        let field = value
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| ApiError::Decode(format!("missing field '{key}'")))?;
        serde_json::from_value(field).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
