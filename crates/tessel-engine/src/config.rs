//! Engine configuration.
//!
//! Provides logging, auto-save and world parameters. Configuration can be
//! loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tessel_world::WorldConfig;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "tessel.toml";

/// Log filter used when neither `RUST_LOG` nor the file sets one.
pub const DEFAULT_LOG_FILTER: &str = "tessel=info";

/// Minimum auto-save interval in seconds (0 disables auto-save).
pub const MIN_AUTOSAVE_INTERVAL_SECS: u64 = 5;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// File is not a valid configuration document
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Logging ===
    /// `tracing` filter directive
    pub log_filter: String,
    /// Emit JSON log lines instead of plain text
    pub log_json: bool,

    // === Auto-save ===
    /// Auto-save interval in seconds (0 = disabled)
    pub autosave_interval_secs: u64,
    /// Save from a background thread instead of the session loop
    pub background_autosave: bool,

    // === World ===
    /// Seed for new worlds (None = derived from the clock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_seed: Option<i64>,
    /// World parameters
    pub world: WorldConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
            autosave_interval_secs: 300, // 5 minutes
            background_autosave: false,
            default_seed: None,
            world: WorldConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Configuration file in the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Reads a configuration file. A missing file is `Ok(None)`.
    pub fn read(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            },
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Turns the outcome of [`read`](Self::read) into a validated config,
    /// falling back to defaults with a warning.
    pub fn resolve(read: Result<Option<Self>, ConfigError>, path: &Path) -> Self {
        let mut config = match read {
            Ok(Some(config)) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Ok(None) => {
                info!("Config file {} not found, using defaults", path.display());
                Self::default()
            },
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            },
        };
        config.validate();
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        }
        if self.autosave_interval_secs != 0 {
            self.autosave_interval_secs = self.autosave_interval_secs.max(MIN_AUTOSAVE_INTERVAL_SECS);
        }
        self.world.validate();
    }

    /// Whether auto-save is enabled.
    pub const fn autosave_enabled(&self) -> bool {
        self.autosave_interval_secs > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(path: impl AsRef<Path>) -> EngineConfig {
        let path = path.as_ref();
        EngineConfig::resolve(EngineConfig::read(path), path)
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.log_filter, "tessel=info");
        assert_eq!(config.autosave_interval_secs, 300);
        assert!(config.autosave_enabled());
        assert_eq!(config.world.render_distance, 4);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            log_filter: "  ".to_string(),
            autosave_interval_secs: 1,
            ..EngineConfig::default()
        };
        config.world.chunk_size = 1_000;

        config.validate();

        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.autosave_interval_secs, MIN_AUTOSAVE_INTERVAL_SECS);
        assert_eq!(config.world.chunk_size, 128);

        let mut disabled = EngineConfig {
            autosave_interval_secs: 0,
            ..EngineConfig::default()
        };
        disabled.validate();
        assert!(!disabled.autosave_enabled());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig {
            autosave_interval_secs: 60,
            default_seed: Some(12345),
            ..EngineConfig::default()
        };
        config.world.save_root = temp_dir.path().join("worlds");
        config.world.terrain.trees.enabled = false;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = load(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(
            &config_path,
            "autosave_interval_secs = 30\n\n[world]\nrender_distance = 2\n",
        )
        .expect("write");

        let loaded = load(&config_path);
        assert_eq!(loaded.autosave_interval_secs, 30);
        assert_eq!(loaded.world.render_distance, 2);
        assert_eq!(loaded.world.chunk_size, 32);
        assert_eq!(loaded.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_config_load_missing_file() {
        let read = EngineConfig::read("/nonexistent/path/tessel.toml").expect("read");
        assert!(read.is_none());
        let config = load("/nonexistent/path/tessel.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "autosave_interval_secs = \"soon\"").expect("write");

        assert!(matches!(
            EngineConfig::read(&config_path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(load(&config_path), EngineConfig::default());
    }
}
