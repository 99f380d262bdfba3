use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

const APP_NAME: &str = "admin-dashboard";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured base URL
pub const BASE_URL_ENV: &str = "ADMIN_API_URL";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Root every endpoint path is resolved under, e.g. `https://host/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_sec: u64,
    /// How long to wait for a TCP connection before giving up
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Mirror stored credentials into the OS keyring
    #[serde(default = "default_use_keyring")]
    pub use_keyring: bool,
    /// Overrides the default credentials file location
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_upload_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_use_keyring() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_sec: default_request_timeout(),
            upload_timeout_sec: default_upload_timeout(),
            connect_timeout_sec: default_connect_timeout(),
            use_keyring: default_use_keyring(),
            credentials_file: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_sec)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_sec)
    }

    /// Applies environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }
}

/// Configuration manager
pub struct ConfigManager {
    path: PathBuf,
    config: RwLock<Config>,
}

impl ConfigManager {
    /// Creates a configuration manager for the default config file
    pub fn new() -> Result<Self> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        Self::with_path(config_dir.join(CONFIG_FILE))
    }

    /// Creates a configuration manager for a specific file
    ///
    /// A missing or malformed file yields the defaults.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(&path).context("Failed to read config file")?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            Config::default()
        };

        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    /// Gets a copy of the current configuration
    pub fn get(&self) -> Config {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Updates and saves the configuration
    pub fn save(&self, config: Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        std::fs::write(&self.path, json).context("Failed to write config file")?;

        // Update in-memory config
        if let Ok(mut guard) = self.config.write() {
            *guard = config;
        }

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_NAME))
    }
}
