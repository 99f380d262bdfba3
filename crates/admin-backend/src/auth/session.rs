use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use super::store::{KeyValueStore, StoreError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Token pair held by a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Tokens issued by the login and refresh endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Lifecycle of the session as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credentials have been loaded or issued
    Anonymous,
    /// An access token is present
    Authenticated,
    /// The server rejected the session and refresh failed; log in again
    Expired,
    /// The user logged out
    LoggedOut,
}

#[derive(Default)]
struct SessionInner {
    credentials: Credentials,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Session credentials shared between a client and its observers
///
/// Tokens are cached in memory and written through to the injected store.
/// Storage failures are logged; the in-memory pair stays authoritative for
/// the running process.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    inner: RwLock<SessionInner>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Session {
    /// Creates an empty session over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let (status_tx, _) = watch::channel(SessionStatus::Anonymous);
        Arc::new(Self {
            store,
            inner: RwLock::new(SessionInner::default()),
            status_tx,
        })
    }

    /// Creates a session and restores any credentials persisted in `store`
    pub async fn restore(store: Arc<dyn KeyValueStore>) -> Result<Arc<Self>, StoreError> {
        let session = Self::new(store);
        session.load().await?;
        Ok(session)
    }

    /// Reloads credentials from the store
    pub async fn load(&self) -> Result<bool, StoreError> {
        let credentials = Credentials {
            access_token: self.store.get(ACCESS_TOKEN_KEY).await?,
            refresh_token: self.store.get(REFRESH_TOKEN_KEY).await?,
        };
        let authenticated = credentials.access_token.is_some();

        self.inner.write().await.credentials = credentials;
        if authenticated {
            self.publish(SessionStatus::Authenticated);
        }
        debug!(authenticated, "Session loaded from storage");

        Ok(authenticated)
    }

    /// Returns a receiver for status change notifications
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    fn publish(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Snapshot of the current token pair
    pub async fn credentials(&self) -> Credentials {
        self.inner.read().await.credentials.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.credentials.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.read().await.credentials.refresh_token.clone()
    }

    /// When the tokens were last replaced by a refresh
    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.refreshed_at
    }

    /// Stores a freshly issued token pair
    ///
    /// A pair without a refresh token keeps the previous refresh token.
    pub async fn update(&self, tokens: TokenPair) {
        let credentials = {
            let mut inner = self.inner.write().await;
            inner.credentials.access_token = Some(tokens.access_token);
            if tokens.refresh_token.is_some() {
                inner.credentials.refresh_token = tokens.refresh_token;
            }
            inner.refreshed_at = Some(Utc::now());
            inner.credentials.clone()
        };

        if let Err(e) = self.persist(&credentials).await {
            warn!("Failed to persist session credentials: {}", e);
        }
        self.publish(SessionStatus::Authenticated);
    }

    async fn persist(&self, credentials: &Credentials) -> Result<(), StoreError> {
        if let Some(ref access) = credentials.access_token {
            self.store.set(ACCESS_TOKEN_KEY, access).await?;
        }
        match credentials.refresh_token {
            Some(ref refresh) => self.store.set(REFRESH_TOKEN_KEY, refresh).await,
            None => self.store.remove(REFRESH_TOKEN_KEY).await,
        }
    }

    /// Drops all credentials and publishes `status`
    pub async fn clear(&self, status: SessionStatus) {
        {
            let mut inner = self.inner.write().await;
            inner.credentials = Credentials::default();
            inner.refreshed_at = None;
        }

        let removed = async {
            self.store.remove(ACCESS_TOKEN_KEY).await?;
            self.store.remove(REFRESH_TOKEN_KEY).await
        };
        if let Err(e) = removed.await {
            warn!("Failed to remove stored credentials: {}", e);
        }
        self.publish(status);
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.credentials.access_token.is_some()
    }
}
