mod login;
mod session;
pub mod store;

pub use session::{Credentials, Session, SessionStatus, TokenPair};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

/// Path of the admin login endpoint, relative to the API root
pub const LOGIN_PATH: &str = "/auth/admin/login";

/// Path of the logout endpoint, relative to the API root
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Path of the token refresh endpoint, relative to the API root
pub const REFRESH_PATH: &str = "/auth/refresh";
