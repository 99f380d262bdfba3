use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::warn;

const SERVICE_NAME: &str = "admin-dashboard";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "admin_token";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "admin_refresh_token";

/// Token store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store is poisoned")]
    Poisoned,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Trait for persistent key-value storage of session credentials
///
/// This abstraction allows swapping the OS-backed store for an in-memory one
/// in tests or short-lived sessions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every value held by this store
    async fn clear(&self) -> Result<(), StoreError>;
}

/// File-backed store with keyring mirroring
///
/// Values live in a JSON map on disk. Each value is also copied into the OS
/// keyring when one is available; the keyring is only read when the file has
/// no entry.
pub struct FileStore {
    path: PathBuf,
    use_keyring: bool,
}

impl FileStore {
    /// Creates a store at the default location in the config directory
    pub fn new(use_keyring: bool) -> Result<Self> {
        let config_dir = crate::config::ConfigManager::config_dir()?;
        Ok(Self::with_path(config_dir.join(CREDENTIALS_FILE), use_keyring))
    }

    /// Creates a store backed by a specific file
    pub fn with_path(path: PathBuf, use_keyring: bool) -> Self {
        Self { path, use_keyring }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path).context("Failed to read credentials file")?;
        serde_json::from_str(&data).context("Failed to parse credentials file")
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create credentials directory")?;
        }
        let data = serde_json::to_string_pretty(map).context("Failed to serialize credentials")?;
        std::fs::write(&self.path, data).context("Failed to write credentials file")
    }

    fn keyring_entry(&self, key: &str) -> Option<keyring::Entry> {
        if !self.use_keyring {
            return None;
        }
        keyring::Entry::new(SERVICE_NAME, key).ok()
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        // Try file storage first (more reliable)
        if let Some(value) = self.read_map()?.remove(key) {
            return Ok(Some(value));
        }

        // Fall back to keyring
        if let Some(entry) = self.keyring_entry(key) {
            if let Ok(value) = entry.get_password() {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;

        if let Some(entry) = self.keyring_entry(key) {
            if let Err(e) = entry.set_password(value) {
                warn!(key = key, "Failed to mirror credential into keyring: {}", e);
            }
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }

        if let Some(entry) = self.keyring_entry(key) {
            keyring_entry_removed(key, entry.delete_credential());
        }

        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let keys: Vec<String> = self.read_map()?.into_keys().collect();

        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to delete credentials file")?;
        }

        for key in keys.iter().map(String::as_str).chain([ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]) {
            if let Some(entry) = self.keyring_entry(key) {
                keyring_entry_removed(key, entry.delete_credential());
            }
        }

        Ok(())
    }
}

/// Logs a failed keyring delete and reports whether the entry is gone
///
/// A missing entry counts as removed.
fn keyring_entry_removed(key: &str, result: keyring::Result<()>) -> bool {
    match result {
        Ok(()) | Err(keyring::Error::NoEntry) => true,
        Err(e) => {
            warn!(key = key, "Failed to remove credential from keyring: {}", e);
            false
        }
    }
}

/// In-memory store
///
/// Holds values for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory store holding the given pairs
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.clear();
        Ok(())
    }
}
