//! Typed wrappers over the admin and management endpoints
//!
//! Each wrapper goes through [`ApiClient::request`](crate::api::ApiClient::request),
//! so the refresh-and-retry contract applies unchanged; the envelope is then
//! decoded into a typed result.

mod management;
mod platform;
mod types;
mod users;

pub use types::*;

use crate::api::{ApiError, ApiResponse};

/// Builds `path?k=v&...` from the pairs that have a value
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

/// Encodes a single path segment such as a user id or service name
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Turns `{"success": false, ...}` bodies delivered with a 2xx status into failures
pub(crate) fn check_success_flag(response: ApiResponse) -> ApiResponse {
    let flagged_failure = response.success
        && response
            .data
            .as_ref()
            .and_then(|d| d.get("success"))
            .and_then(serde_json::Value::as_bool)
            == Some(false);

    if !flagged_failure {
        return response;
    }

    let message = response
        .data
        .as_ref()
        .and_then(|d| d.get("error").or_else(|| d.get("message")))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Operation failed")
        .to_string();

    ApiResponse::failure(ApiError::Http {
        status: response.status.unwrap_or(200),
        message,
    })
}
