/// Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use contact_book_mod_history::HistoryConfig;
use serde::{Deserialize, Serialize};

/// File name of the config inside the data directory.
const CONFIG_FILE_NAME: &str = "contact-book.json";

/// File name of the persisted contact list inside the data directory.
const DATA_FILE_NAME: &str = "contacts.json";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Undo/redo settings for the contact list.
    pub history: HistoryConfig,
    /// Where the current contact list is saved after every change.
    /// Empty = `contacts.json` in the data directory.
    pub data_file: String,
    /// Default directory for `backup`/`restore` with relative file names.
    /// Empty = the data directory.
    pub backup_dir: String,
}

impl AppConfig {
    /// Returns the config file path.
    ///
    /// Resolution order:
    /// 1. `CONTACT_BOOK_CONFIG` environment variable
    /// 2. `contact-book.json` in the data directory
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CONTACT_BOOK_CONFIG") {
            return PathBuf::from(path);
        }
        resolve_data_dir().join(CONFIG_FILE_NAME)
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (unreadable file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Don't overwrite a broken file
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    /// Returns the effective path of the contact data file.
    pub fn data_file_path(&self) -> PathBuf {
        if self.data_file.is_empty() {
            resolve_data_dir().join(DATA_FILE_NAME)
        } else {
            PathBuf::from(&self.data_file)
        }
    }

    /// Resolves a backup file name against `backup_dir`.
    ///
    /// Absolute paths are returned unchanged.
    pub fn backup_path(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let dir = if self.backup_dir.is_empty() {
            resolve_data_dir()
        } else {
            PathBuf::from(&self.backup_dir)
        };
        dir.join(path)
    }

    /// Resets invalid fields to usable values.
    pub fn sanitize(&mut self) {
        self.history.sanitize();
        self.data_file = self.data_file.trim().to_string();
        self.backup_dir = self.backup_dir.trim().to_string();
    }
}

/// Resolves the data directory path.
///
/// Resolution order:
/// 1. `CONTACT_BOOK_DATA_DIR` environment variable
/// 2. `contact-book/` in the platform data directory
/// 3. `.data/` directory next to the executable
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONTACT_BOOK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join("contact-book");
    }
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe.parent().unwrap_or(Path::new(".")).join(".data")
}
