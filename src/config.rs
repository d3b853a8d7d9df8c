//! Engine configuration.
//!
//! Layered sources, lowest to highest precedence: built-in defaults, an
//! optional TOML file, and `SWATCH_`-prefixed environment variables
//! (e.g. `SWATCH_HISTORY_CAP=200`, `SWATCH_STORAGE__STORE_PATH=/tmp/s`).

use crate::debounce::DEFAULT_DEBOUNCE_WINDOW_MS;
use crate::error::EngineError;
use crate::history::DEFAULT_HISTORY_CAP;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled snapshot store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            store_path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    match ProjectDirs::from("design", "swatch", "swatch") {
        Some(dirs) => dirs.data_dir().join("snapshots"),
        None => PathBuf::from(".swatch/snapshots"),
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwatchConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-stack undo history bound.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Quiet window for coalescing interactive input, in milliseconds.
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_debounce_window_ms() -> u64 {
    DEFAULT_DEBOUNCE_WINDOW_MS
}

impl Default for SwatchConfig {
    fn default() -> Self {
        SwatchConfig {
            storage: StorageConfig::default(),
            history_cap: default_history_cap(),
            debounce_window_ms: default_debounce_window_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SwatchConfig {
    /// Load configuration, optionally layering a TOML file under the
    /// environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = Config::builder()
            .set_default("history_cap", default_history_cap() as u64)?
            .set_default("debounce_window_ms", default_debounce_window_ms())?
            .set_default(
                "storage.store_path",
                default_store_path().to_string_lossy().to_string(),
            )?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        let settings = builder
            .add_source(Environment::with_prefix("SWATCH").separator("__"))
            .build()?;
        let config: SwatchConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// Write this configuration as a TOML file, creating parent directories.
    /// Used to seed an editable config on first run.
    pub fn write_file(&self, path: &Path) -> Result<(), EngineError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Init(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EngineError::Init(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }
        std::fs::write(path, text)
            .map_err(|e| EngineError::Init(format!("Failed to write {:?}: {}", path, e)))?;
        Ok(())
    }
}
