//! XDG-compliant path management

use directories::ProjectDirs;
use std::path::PathBuf;

/// Manages all application paths using XDG base directory specification
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directories from XDG
    dirs: Option<ProjectDirs>,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    /// Create a new Paths instance
    pub fn new() -> Self {
        let dirs = ProjectDirs::from("", "", "scriptstore");
        if dirs.is_none() {
            tracing::warn!("No home directory found, falling back to ./.scriptstore");
        }
        Self { dirs }
    }

    fn fallback_dir() -> PathBuf {
        PathBuf::from(".scriptstore")
    }

    // ========== Config Paths ==========

    /// Config directory: ~/.config/scriptstore/
    pub fn config_dir(&self) -> PathBuf {
        self.dirs
            .as_ref()
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(Self::fallback_dir)
    }

    /// Main config file: ~/.config/scriptstore/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.toml")
    }

    // ========== Data Paths ==========

    /// Data directory: ~/.local/share/scriptstore/
    pub fn data_dir(&self) -> PathBuf {
        self.dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(Self::fallback_dir)
    }

    /// Default device storage root: ~/.local/share/scriptstore/device/
    pub fn device_dir(&self) -> PathBuf {
        self.data_dir().join("device")
    }

    /// Log file: ~/.local/share/scriptstore/scriptstore.log
    pub fn log_file(&self) -> PathBuf {
        self.data_dir().join("scriptstore.log")
    }

    // ========== Utility Methods ==========

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.data_dir())?;
        Ok(())
    }
}
