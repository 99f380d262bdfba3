//! Authenticated client for the admin dashboard API
//!
//! [`ApiClient`] attaches the stored bearer token to every call, refreshes it
//! once when the server answers 401 and normalizes every outcome into an
//! [`ApiResponse`].

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;

#[cfg(test)]
pub mod testutil;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, ProgressCallback, UploadForm};
pub use auth::{FileStore, KeyValueStore, MemoryStore, Session, SessionStatus};
pub use config::{Config, ConfigManager};
