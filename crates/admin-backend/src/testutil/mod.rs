//! Test utilities for the admin client
//!
//! Provides a ready-made authenticated client over the HTTP mock and canned
//! backend payloads.

pub mod fixtures;

use std::sync::Arc;

pub use crate::api::http::mock::{MockHttpClient, RecordedRequest};
use crate::api::ApiClient;
use crate::auth::store::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::auth::Session;

/// Base URL used by unit tests
pub const TEST_BASE_URL: &str = "https://admin.test/api";

/// Resolves `path` under [`TEST_BASE_URL`]
pub fn url(path: &str) -> String {
    format!("{TEST_BASE_URL}{path}")
}

/// Creates a client whose session holds `test_access`/`test_refresh`
pub async fn client_with(mock: MockHttpClient) -> ApiClient<MockHttpClient> {
    let store = Arc::new(MemoryStore::with_values([
        (ACCESS_TOKEN_KEY, "test_access"),
        (REFRESH_TOKEN_KEY, "test_refresh"),
    ]));
    let session = Session::restore(store)
        .await
        .expect("memory store never fails");
    ApiClient::with_http_client(mock, TEST_BASE_URL, session)
}
