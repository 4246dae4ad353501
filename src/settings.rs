//! Persistent workbench settings.
//!
//! Stored as pretty JSON at `$TABLEDESK_SETTINGS`, or
//! `<config dir>/tabledesk/settings.json` when that is unset. Every field has a
//! default, so partial files are fine. A missing file yields the defaults; a
//! malformed one is logged and ignored.

use crate::constants::{
    BYTES_PER_MB, DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_SESSIONS,
    DEFAULT_PAGE_SIZE, DEFAULT_SERVER_ADDR, DEFAULT_SERVER_WORKERS, MAX_UPLOAD_MB,
};
use crate::data::cache::CacheConfig;
use crate::data::error::DataResult;
use crate::data::export::Quoting;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV: &str = "TABLEDESK_SETTINGS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_page_size: usize,
    /// Page-size preferences kept, least recently used forgotten first (min 1)
    pub max_sessions: usize,
    pub max_upload_mb: usize,
    pub cache: CacheSettings,
    pub server: ServerSettings,
    pub export: ExportSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    /// `null` keeps datasets until LRU eviction
    pub ttl_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    pub workers: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub quoting: Quoting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_upload_mb: MAX_UPLOAD_MB,
            cache: CacheSettings::default(),
            server: ServerSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            ttl_secs: Some(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_SERVER_ADDR.to_string(),
            workers: DEFAULT_SERVER_WORKERS,
        }
    }
}

impl Settings {
    /// Where settings are read from and saved to
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("tabledesk").join("settings.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No settings file, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed settings file, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> DataResult<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => {
                warn!("No config directory, settings not saved");
                Ok(())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Upload cap in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        (self.max_upload_mb as u64).saturating_mul(BYTES_PER_MB)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache.max_entries,
            ttl: self.cache.ttl_secs.map(Duration::from_secs),
        }
    }
}
