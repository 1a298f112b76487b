//! Persistent preferences for the Jupyter extensions.
//!
//! Settings are stored in a JSON file in the user's config directory:
//! - macOS: ~/Library/Application Support/sesame-jupyter/settings.json
//! - Linux: ~/.config/sesame-jupyter/settings.json
//! - Windows: C:\Users\<User>\AppData\Roaming\sesame-jupyter\settings.json

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_KERNEL: &str = "python3";

fn default_kernel() -> String {
    DEFAULT_KERNEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Kernelspec launched when no kernel is named
    #[serde(default = "default_kernel")]
    pub default_kernel: String,

    /// Directory the notebook file pickers start in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_dialog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_kernel: default_kernel(),
            file_dialog_path: None,
        }
    }
}

impl Settings {
    /// Start directory for file pickers: the last used one, else home.
    pub fn dialog_dir(&self) -> PathBuf {
        self.file_dialog_path
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Get the path to the settings file
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sesame-jupyter")
        .join("settings.json")
}

/// Load settings from `path`, returning defaults if it is missing or unreadable
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    } else {
        Settings::default()
    }
}

/// Save settings to `path`, creating parent directories
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}
