use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient, RequestBody};
use super::request::ApiRequest;
use super::response::{ApiError, ApiResponse};
use super::upload::{ProgressTracker, UploadForm};
use crate::auth::{Session, SessionStatus, TokenPair, REFRESH_PATH};
use crate::config::Config;

/// Default per-request timeout when none is configured
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for uploads when none is configured
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Authenticated client for the admin API
///
/// Generic over the HTTP client implementation for testability. Every call
/// returns an [`ApiResponse`]; expected failures never surface as `Err`.
pub struct ApiClient<H: HttpClient = ReqwestClient> {
    http: H,
    base_url: String,
    session: Arc<Session>,
    refresh_lock: Arc<Mutex<()>>,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl ApiClient<ReqwestClient> {
    /// Creates a client with the default HTTP implementation
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self::with_http_client(ReqwestClient::new(), base_url, session)
    }

    /// Creates a client from configuration
    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = ReqwestClient::with_connect_timeout(config.connect_timeout())?;
        Ok(Self::with_http_client(http, config.base_url.clone(), session)
            .with_timeouts(config.request_timeout(), config.upload_timeout()))
    }
}

impl<H: HttpClient> ApiClient<H> {
    /// Creates a client over a custom HTTP implementation
    pub fn with_http_client(http: H, base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            refresh_lock: Arc::new(Mutex::new(())),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Overrides the default request and upload timeouts
    pub fn with_timeouts(mut self, request: Duration, upload: Duration) -> Self {
        self.request_timeout = request;
        self.upload_timeout = upload;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Resolves an endpoint path under the base URL
    ///
    /// Absolute URLs are used unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds the headers for a request: defaults first, then caller overrides
    fn build_headers(
        &self,
        overrides: &HeaderMap,
        token: Option<&str>,
        json_body: bool,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::InvalidRequest("access token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        if json_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in overrides {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Sends one attempt of `request` with `token`
    ///
    /// The body is rebuilt from the descriptor on every attempt, so a retry
    /// streams uploads again from the start.
    pub(crate) async fn send_once(
        &self,
        request: &ApiRequest,
        form: Option<&UploadForm>,
        tracker: Option<&ProgressTracker>,
        token: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let body = match form {
            Some(form) => RequestBody::Multipart(form.to_body(tracker)),
            None if request.sends_body() => {
                RequestBody::Json(request.body.clone().unwrap_or(serde_json::Value::Null))
            }
            None => RequestBody::Empty,
        };
        let headers = self.build_headers(&request.headers, token, form.is_none())?;
        let url = self.url(&request.path);
        let timeout = request.timeout.unwrap_or(self.request_timeout);

        debug!(method = %request.method, url = %url, "Sending request");

        let http_request = HttpRequest {
            method: request.method.clone(),
            url,
            headers,
            body,
        };

        match tokio::time::timeout(timeout, self.http.execute(http_request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    /// Runs a call through the attempt → refresh → retry-once sequence
    pub(crate) async fn execute(
        &self,
        request: &ApiRequest,
        form: Option<&UploadForm>,
        tracker: Option<&ProgressTracker>,
    ) -> ApiResponse {
        let token = self.session.access_token().await;

        let response = match self.send_once(request, form, tracker, token.as_deref()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %request.method, path = %request.path, "Request failed: {}", err);
                return ApiResponse::failure(err);
            }
        };

        if !response.is_unauthorized() {
            return ApiResponse::from_http(&response);
        }

        debug!(path = %request.path, "Received 401, attempting token refresh");

        let new_token = match self.refresh_after_unauthorized(token.as_deref()).await {
            Ok(new_token) => new_token,
            Err(err) => {
                warn!("Token refresh failed: {}", err);
                self.expire_session().await;
                return ApiResponse::failure(ApiError::AuthenticationRequired);
            }
        };

        // Single retry; its outcome is final
        match self.send_once(request, form, tracker, Some(&new_token)).await {
            Ok(retried) if retried.is_unauthorized() => {
                warn!(path = %request.path, "Retried request still unauthorized");
                self.expire_session().await;
                ApiResponse::failure(ApiError::AuthenticationRequired)
            }
            Ok(retried) => ApiResponse::from_http(&retried),
            Err(err) => ApiResponse::failure(err),
        }
    }

    /// Obtains a usable access token after a 401 sent with `stale`
    ///
    /// Refreshes are serialized. When another call already replaced the stale
    /// token, the current one is returned without contacting the server.
    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let credentials = self.session.credentials().await;
        if let Some(current) = credentials.access_token {
            if Some(current.as_str()) != stale {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let refresh_token = credentials
            .refresh_token
            .ok_or(ApiError::AuthenticationRequired)?;
        let tokens = self.call_refresh_endpoint(&refresh_token).await?;
        let access_token = tokens.access_token.clone();

        self.session.update(tokens).await;
        info!("Access token refreshed");

        Ok(access_token)
    }

    async fn call_refresh_endpoint(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH, json!({ "refresh_token": refresh_token }));
        let response = self.send_once(&request, None, None, None).await?;

        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                message: response.error_message(),
            });
        }

        parse_tokens(&response)
            .ok_or_else(|| ApiError::Decode("refresh response did not contain an access token".to_string()))
    }

    async fn expire_session(&self) {
        info!("Session expired, clearing stored credentials");
        self.session.clear(SessionStatus::Expired).await;
    }

    /// Issues an authenticated request
    pub async fn request(&self, request: ApiRequest) -> ApiResponse {
        self.execute(&request, None, None).await
    }

    pub async fn get(&self, path: &str) -> ApiResponse {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.request(ApiRequest::post(path, body)).await
    }

    pub async fn put(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.request(ApiRequest::put(path, body)).await
    }

    pub async fn patch(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.request(ApiRequest::patch(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResponse {
        self.request(ApiRequest::delete(path)).await
    }

    /// Issues all requests concurrently
    ///
    /// Each outcome is independent and the output order matches the input.
    pub async fn batch(&self, requests: Vec<ApiRequest>) -> Vec<ApiResponse> {
        debug!(count = requests.len(), "Issuing batch");
        join_all(requests.iter().map(|r| self.execute(r, None, None))).await
    }

    /// Issues a request that gives up when `cancel` becomes `true`
    ///
    /// Dropping the sender never cancels.
    pub async fn request_with_cancel(
        &self,
        request: ApiRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> ApiResponse {
        tokio::select! {
            response = self.request(request) => response,
            () = cancelled(&mut cancel) => {
                debug!("Request cancelled by caller");
                ApiResponse::failure(ApiError::Cancelled)
            }
        }
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Extracts a token pair from a login or refresh response
///
/// Accepts the pair at the top level or wrapped in `data`.
pub(crate) fn parse_tokens(response: &HttpResponse) -> Option<TokenPair> {
    let value = response.json::<serde_json::Value>().ok()?;
    serde_json::from_value::<TokenPair>(value.clone())
        .ok()
        .or_else(|| serde_json::from_value(value.get("data")?.clone()).ok())
}

impl<H: HttpClient + Clone> Clone for ApiClient<H> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            session: self.session.clone(),
            refresh_lock: self.refresh_lock.clone(),
            request_timeout: self.request_timeout,
            upload_timeout: self.upload_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::mock::MockHttpClient;
    use reqwest::Method;
    use crate::auth::store::{KeyValueStore, MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::api::upload::ProgressCallback;
    use std::sync::Mutex as StdMutex;

    const BASE: &str = "https://admin.test/api";

    fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    async fn session_with(access: Option<&str>, refresh: Option<&str>) -> (Arc<Session>, Arc<MemoryStore>) {
        let mut pairs = Vec::new();
        if let Some(a) = access {
            pairs.push((ACCESS_TOKEN_KEY, a));
        }
        if let Some(r) = refresh {
            pairs.push((REFRESH_TOKEN_KEY, r));
        }
        let store = Arc::new(MemoryStore::with_values(pairs));
        let session = Session::restore(store.clone()).await.unwrap();
        (session, store)
    }

    async fn client_with(mock: MockHttpClient) -> (ApiClient<MockHttpClient>, Arc<MemoryStore>) {
        let (session, store) = session_with(Some("old_access"), Some("refresh_1")).await;
        (ApiClient::with_http_client(mock, BASE, session), store)
    }

    // === Success and error normalization ===

    #[tokio::test]
    async fn success_returns_parsed_data() {
        let mock = MockHttpClient::new().on(Method::GET, &url("/admin/dashboard"), 200, r#"{"users": {"total": 12}}"#);
        let (client, _) = client_with(mock).await;

        let response = client.get("/admin/dashboard").await;

        assert!(response.success);
        assert_eq!(response.status, Some(200));
        assert_eq!(response.data, Some(json!({"users": {"total": 12}})));
    }

    #[tokio::test]
    async fn sends_bearer_and_json_headers() {
        let mock = MockHttpClient::new().on(Method::GET, &url("/admin/users"), 200, "{}");
        let (client, _) = client_with(mock.clone()).await;

        client.get("/admin/users").await;

        let requests = mock.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer().as_deref(), Some("old_access"));
        assert_eq!(requests[0].headers.get("Content-Type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn no_authorization_header_without_token() {
        let mock = MockHttpClient::new().on(Method::GET, &url("/public"), 200, "{}");
        let (session, _) = session_with(None, None).await;
        let client = ApiClient::with_http_client(mock.clone(), BASE, session);

        client.get("/public").await;

        assert!(mock.get_requests()[0].bearer().is_none());
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let mock = MockHttpClient::new().on(Method::GET, &url("/management/export-logs"), 200, "ID,Service\n");
        let (client, _) = client_with(mock.clone()).await;

        let request = ApiRequest::get("/management/export-logs")
            .with_header("Content-Type", "text/csv")
            .unwrap()
            .with_header("X-Request-Id", "abc")
            .unwrap();
        let response = client.request(request).await;

        assert!(response.success);
        assert_eq!(response.text.as_deref(), Some("ID,Service\n"));

        let headers = &mock.get_requests()[0].headers;
        assert_eq!(headers.get("Content-Type").unwrap(), "text/csv");
        assert_eq!(headers.get("X-Request-Id").unwrap(), "abc");
        assert!(headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn body_only_sent_for_mutating_methods() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/x"), 200, "{}")
            .on(Method::POST, &url("/x"), 201, "{}");
        let (client, _) = client_with(mock.clone()).await;

        client
            .request(ApiRequest::get("/x").with_body(json!({"ignored": true})))
            .await;
        client.post("/x", json!({"service_name": "openai"})).await;

        let requests = mock.get_requests();
        assert!(requests[0].json.is_none());
        assert_eq!(requests[1].json, Some(json!({"service_name": "openai"})));
    }

    #[tokio::test]
    async fn http_error_carries_status_and_server_message() {
        let mock = MockHttpClient::new().on(
            Method::POST,
            &url("/management/api-keys"),
            400,
            r#"{"success": false, "error": "Missing required field: api_key"}"#,
        );
        let (client, _) = client_with(mock).await;

        let response = client.post("/management/api-keys", json!({})).await;

        assert!(!response.success);
        assert_eq!(
            response.error,
            Some(ApiError::Http {
                status: 400,
                message: "Missing required field: api_key".to_string()
            })
        );
    }

    #[tokio::test]
    async fn transport_error_is_recovered_into_envelope() {
        let mock = MockHttpClient::new().on_transport_error(Method::GET, &url("/admin/users"), "connection refused");
        let (client, store) = client_with(mock).await;

        let response = client.get("/admin/users").await;

        assert!(!response.success);
        assert_eq!(response.error, Some(ApiError::Transport("connection refused".to_string())));
        // Credentials survive transport failures
        assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_some());
    }

    // === 401 handling ===

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_retries_once() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/admin/users"), 401, r#"{"msg": "Token has expired"}"#)
            .on(Method::GET, &url("/admin/users"), 200, r#"{"users": []}"#)
            .on(
                Method::POST,
                &url("/auth/refresh"),
                200,
                r#"{"access_token": "new_access", "refresh_token": "refresh_2"}"#,
            );
        let (client, store) = client_with(mock.clone()).await;

        let response = client.get("/admin/users").await;

        assert!(response.success);
        assert_eq!(response.data, Some(json!({"users": []})));
        assert_eq!(mock.count_for(&url("/auth/refresh")), 1);
        assert_eq!(mock.count_for(&url("/admin/users")), 2);

        let requests = mock.get_requests();
        let refresh = requests.iter().find(|r| r.url == url("/auth/refresh")).unwrap();
        assert_eq!(refresh.json, Some(json!({"refresh_token": "refresh_1"})));
        assert!(refresh.bearer().is_none());
        assert_eq!(requests.last().unwrap().bearer().as_deref(), Some("new_access"));

        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("new_access"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("refresh_2"));
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_token_clears_session() {
        let mock = MockHttpClient::new().on(Method::GET, &url("/admin/users"), 401, "{}");
        let (session, store) = session_with(Some("old_access"), None).await;
        let client = ApiClient::with_http_client(mock.clone(), BASE, session.clone());

        let response = client.get("/admin/users").await;

        assert!(response.requires_login());
        assert_eq!(mock.request_count(), 1);
        assert!(session.credentials().await.is_empty());
        assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
        assert_eq!(session.status(), SessionStatus::Expired);
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_without_retry() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/admin/users"), 401, "{}")
            .on(Method::POST, &url("/auth/refresh"), 401, r#"{"error": "Invalid refresh token"}"#);
        let (client, store) = client_with(mock.clone()).await;
        let mut status = client.session().subscribe();

        let response = client.get("/admin/users").await;

        assert!(!response.success);
        assert!(response.requires_login());
        assert_eq!(mock.count_for(&url("/auth/refresh")), 1);
        assert_eq!(mock.count_for(&url("/admin/users")), 1);
        assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).await.unwrap().is_none());
        assert_eq!(*status.borrow_and_update(), SessionStatus::Expired);
    }

    #[tokio::test]
    async fn malformed_refresh_response_counts_as_failure() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/admin/users"), 401, "{}")
            .on(Method::POST, &url("/auth/refresh"), 200, "<html></html>");
        let (client, _) = client_with(mock.clone()).await;

        let response = client.get("/admin/users").await;

        assert!(response.requires_login());
        assert_eq!(mock.count_for(&url("/admin/users")), 1);
    }

    #[tokio::test]
    async fn retried_unauthorized_does_not_refresh_again() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/admin/users"), 401, "{}")
            .on(
                Method::POST,
                &url("/auth/refresh"),
                200,
                r#"{"access_token": "new_access", "refresh_token": "refresh_2"}"#,
            );
        let (client, _) = client_with(mock.clone()).await;

        let response = client.get("/admin/users").await;

        assert!(response.requires_login());
        assert_eq!(mock.count_for(&url("/auth/refresh")), 1);
        assert_eq!(mock.count_for(&url("/admin/users")), 2);
        assert!(!client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn refresh_accepts_tokens_wrapped_in_data() {
        let mock = MockHttpClient::new()
            .on(Method::GET, &url("/admin/users"), 401, "{}")
            .on(Method::GET, &url("/admin/users"), 200, "{}")
            .on(
                Method::POST,
                &url("/auth/refresh"),
                200,
                r#"{"success": true, "data": {"access_token": "wrapped"}}"#,
            );
        let (client, _) = client_with(mock.clone()).await;

        let response = client.get("/admin/users").await;

        assert!(response.success);
        assert_eq!(client.session().access_token().await.as_deref(), Some("wrapped"));
        // Refresh token kept when the server does not rotate it
        assert_eq!(client.session().refresh_token().await.as_deref(), Some("refresh_1"));
    }

    #[tokio::test]
    async fn concurrent_unauthorized_calls_share_one_refresh() {
        let delay = Duration::from_millis(20);
        let mock = MockHttpClient::new()
            .on_delayed(Method::GET, &url("/a"), 401, "{}", delay)
            .on(Method::GET, &url("/a"), 200, r#"{"name": "a"}"#)
            .on_delayed(Method::GET, &url("/b"), 401, "{}", delay)
            .on(Method::GET, &url("/b"), 200, r#"{"name": "b"}"#)
            .on(
                Method::POST,
                &url("/auth/refresh"),
                200,
                r#"{"access_token": "new_access", "refresh_token": "refresh_2"}"#,
            );
        let (client, _) = client_with(mock.clone()).await;

        let results = client
            .batch(vec![ApiRequest::get("/a"), ApiRequest::get("/b")])
            .await;

        assert!(results.iter().all(|r| r.success));
        assert_eq!(mock.count_for(&url("/auth/refresh")), 1);
    }

    // === Batch ===

    #[tokio::test]
    async fn batch_preserves_order_and_isolates_failures() {
        let mock = MockHttpClient::new()
            .on_transport_error(Method::GET, &url("/management/cache-stats"), "connection reset")
            .on(Method::GET, &url("/management/queue-stats"), 200, r#"{"queue_stats": {"pending": 3}}"#)
            .on(Method::DELETE, &url("/management/api-keys/openai"), 404, r#"{"error": "API key not found"}"#);
        let (client, _) = client_with(mock).await;

        let results = client
            .batch(vec![
                ApiRequest::get("/management/cache-stats"),
                ApiRequest::get("/management/queue-stats"),
                ApiRequest::delete("/management/api-keys/openai"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(matches!(results[0].error, Some(ApiError::Transport(_))));
        assert!(results[1].success);
        assert_eq!(results[1].data, Some(json!({"queue_stats": {"pending": 3}})));
        assert_eq!(results[2].status, Some(404));
        assert_eq!(results[2].error_message().as_deref(), Some("API key not found"));
    }

    #[tokio::test]
    async fn batch_of_nothing_is_empty() {
        let (client, _) = client_with(MockHttpClient::new()).await;
        assert!(client.batch(Vec::new()).await.is_empty());
    }

    // === Timeouts and cancellation ===

    #[tokio::test]
    async fn slow_response_times_out() {
        let mock = MockHttpClient::new().on_delayed(
            Method::GET,
            &url("/management/system-health"),
            200,
            "{}",
            Duration::from_millis(500),
        );
        let (client, _) = client_with(mock).await;

        let request = ApiRequest::get("/management/system-health").with_timeout(Duration::from_millis(20));
        let response = client.request(request).await;

        assert_eq!(response.error, Some(ApiError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn cancel_flag_aborts_request() {
        let mock = MockHttpClient::new().on_delayed(
            Method::GET,
            &url("/management/usage-logs"),
            200,
            "{}",
            Duration::from_millis(500),
        );
        let (client, _) = client_with(mock).await;
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });
        let response = client
            .request_with_cancel(ApiRequest::get("/management/usage-logs"), rx)
            .await;

        assert_eq!(response.error, Some(ApiError::Cancelled));
    }

    #[tokio::test]
    async fn dropped_cancel_sender_does_not_cancel() {
        let mock = MockHttpClient::new().on_delayed(
            Method::GET,
            &url("/management/usage-logs"),
            200,
            "{}",
            Duration::from_millis(20),
        );
        let (client, _) = client_with(mock).await;
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let response = client
            .request_with_cancel(ApiRequest::get("/management/usage-logs"), rx)
            .await;

        assert!(response.success);
    }

    // === Uploads ===

    fn progress_recorder() -> (Arc<StdMutex<Vec<f64>>>, ProgressCallback) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Arc::new(move |p: f64| sink.lock().unwrap().push(p)))
    }

    #[tokio::test]
    async fn upload_reports_progress_ending_at_100() {
        let mock = MockHttpClient::new().on(Method::POST, &url("/content/upload"), 201, r#"{"id": 5}"#);
        let (client, _) = client_with(mock.clone()).await;
        let (seen, callback) = progress_recorder();

        let form = UploadForm::new()
            .text("title", "Spring campaign")
            .file("file", "banner.png", "image/png", vec![7u8; 200_000]);
        let response = client.upload("/content/upload", form, Some(callback)).await;

        assert!(response.success);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!((seen.last().unwrap() - 100.0).abs() < f64::EPSILON);

        let request = &mock.get_requests()[0];
        assert_eq!(request.uploaded_bytes, 200_000);
        assert_eq!(request.multipart_fields, vec![("title".to_string(), "Spring campaign".to_string())]);
        assert!(request.headers.get("Content-Type").is_none());
        assert_eq!(request.bearer().as_deref(), Some("old_access"));
    }

    #[tokio::test]
    async fn upload_retry_after_refresh_keeps_progress_monotonic() {
        let mock = MockHttpClient::new()
            .on(Method::POST, &url("/content/upload"), 401, "{}")
            .on(Method::POST, &url("/content/upload"), 200, "{}")
            .on(
                Method::POST,
                &url("/auth/refresh"),
                200,
                r#"{"access_token": "new_access", "refresh_token": "refresh_2"}"#,
            );
        let (client, _) = client_with(mock.clone()).await;
        let (seen, callback) = progress_recorder();

        let form = UploadForm::new().file("file", "a.csv", "text/csv", vec![1u8; 150_000]);
        let response = client.upload("/content/upload", form, Some(callback)).await;

        assert!(response.success);
        assert_eq!(mock.count_for(&url("/content/upload")), 2);
        assert_eq!(mock.get_requests().last().unwrap().uploaded_bytes, 150_000);

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.iter().filter(|p| (**p - 100.0).abs() < f64::EPSILON).count(), 1);
    }

    #[tokio::test]
    async fn upload_without_callback_still_uploads() {
        let mock = MockHttpClient::new().on(Method::POST, &url("/content/upload"), 500, r#"{"error": "disk full"}"#);
        let (client, _) = client_with(mock).await;

        let form = UploadForm::new().file("file", "a.txt", "text/plain", b"hello".to_vec());
        let response = client.upload("/content/upload", form, None).await;

        assert!(!response.success);
        assert_eq!(response.error_message().as_deref(), Some("disk full"));
    }

    // === URL resolution ===

    #[tokio::test]
    async fn url_joins_paths_under_base() {
        let (session, _) = session_with(None, None).await;
        let client = ApiClient::with_http_client(MockHttpClient::new(), "https://admin.test/api/", session);

        assert_eq!(client.url("/admin/users"), "https://admin.test/api/admin/users");
        assert_eq!(client.url("admin/users"), "https://admin.test/api/admin/users");
        assert_eq!(client.url("https://cdn.test/x"), "https://cdn.test/x");
    }
}
