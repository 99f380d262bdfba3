//! Common test utilities for integration tests
//!
//! Routes are stubbed on a `wiremock` server so the client runs over a real
//! socket with the production `ReqwestClient`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use admin_backend::auth::store::{FileStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use admin_backend::{ApiClient, KeyValueStore, Session};
use wiremock::{MockServer, Request};

/// Base URL the client is pointed at; every route lives under `/api`
pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Requests the server received for `path`, in arrival order
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}

/// Bearer token sent with a request, if any
pub fn bearer(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

pub fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Creates a file-backed store under `dir`, keyring disabled
pub fn file_store(dir: &Path) -> Arc<FileStore> {
    Arc::new(FileStore::with_path(dir.join("credentials.json"), false))
}

/// Creates a client for `server` whose store already holds a token pair
pub async fn logged_in_client(server: &MockServer, store: Arc<FileStore>) -> ApiClient {
    store.set(ACCESS_TOKEN_KEY, "old_access").await.unwrap();
    store.set(REFRESH_TOKEN_KEY, "refresh_1").await.unwrap();
    let session = Session::restore(store).await.unwrap();
    ApiClient::new(api_url(server), session)
}
