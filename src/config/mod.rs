//! Configuration management for scriptstore
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/scriptstore/config.toml
//! - Data: ~/.local/share/scriptstore/

mod paths;

pub use paths::Paths;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Default catalog host
pub const DEFAULT_BASE_URL: &str = "http://ghp.iceis.co.uk/";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog host; every endpoint is resolved relative to it
    pub base_url: String,

    /// Device storage settings
    pub storage: StorageConfig,

    /// UI timing and layout
    pub ui: UiConfig,

    /// HTTP client settings
    pub network: NetworkConfig,

    /// Paths configuration
    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
            network: NetworkConfig::default(),
            paths: Paths::new(),
        }
    }
}

/// Where installed files and the version map live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit storage root; wins over everything else
    pub root_override: Option<String>,

    /// Removable card mount point, used when the marker file is present on it
    pub sd_root: Option<String>,

    /// File whose presence on the card selects it as storage root
    pub sd_marker: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_override: None,
            sd_root: None,
            sd_marker: "bruce.conf".to_string(),
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Lifetime of a status message
    pub status_secs: u64,

    /// Lifetime of a short status message
    pub short_status_secs: u64,

    /// Description scroll step interval
    pub scroll_interval_ms: u64,

    /// Input poll timeout per loop iteration
    pub poll_interval_ms: u64,

    /// Fixed description width in characters (derived from the terminal when unset)
    pub max_characters: Option<usize>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_secs: 3,
            short_status_secs: 2,
            scroll_interval_ms: 100,
            poll_interval_ms: 50,
            max_characters: None,
        }
    }
}

impl UiConfig {
    pub fn status_duration(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    pub fn short_status_duration(&self) -> Duration {
        Duration::from_secs(self.short_status_secs)
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Treat the network as unreachable without probing
    pub offline: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("scriptstore/{}", crate::APP_VERSION),
            offline: false,
        }
    }
}

impl Config {
    /// Resolve the device storage root.
    ///
    /// Order: explicit override, then the card root if its marker file exists,
    /// then the XDG data directory.
    pub fn storage_root(&self) -> PathBuf {
        if let Some(root) = self
            .storage
            .root_override
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            return PathBuf::from(root);
        }

        if let Some(sd_root) = self.storage.sd_root.as_deref() {
            let sd_root = Path::new(sd_root);
            if sd_root.join(&self.storage.sd_marker).exists() {
                return sd_root.to_path_buf();
            }
            tracing::debug!(
                "No {} on {}, using internal storage",
                self.storage.sd_marker,
                sd_root.display()
            );
        }

        self.paths.device_dir()
    }

    /// Ensure required directories exist, including overrides.
    pub fn ensure_dirs(&self) -> Result<()> {
        self.paths
            .ensure_dirs()
            .context("Failed to create default application directories")?;
        std::fs::create_dir_all(self.storage_root())
            .context("Failed to create storage root")?;
        Ok(())
    }

    /// Load configuration from disk or create default
    pub async fn load() -> Result<Self> {
        let paths = Paths::new();
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save().await?;
            config
        };

        config.paths = paths;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}
