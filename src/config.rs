use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
}

/// Media server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8095,
        }
    }
}

/// Library cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live for cached first pages, in seconds
    pub ttl_seconds: u64,
    /// Default page size for library fetches
    pub page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            page_size: 50,
        }
    }
}

/// Playback sync tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Debounce window for volume drags, in milliseconds
    pub volume_debounce_ms: u64,
    /// Debounce window for seek scrubbing, in milliseconds (longer than
    /// volume, since scrubbing emits more intermediate values)
    pub seek_debounce_ms: u64,
    /// Progress interpolation tick, in milliseconds
    pub progress_tick_ms: u64,
    /// Grace period after a connect attempt before sampling connectivity,
    /// in milliseconds
    pub connect_grace_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            volume_debounce_ms: 300,
            seek_debounce_ms: 500,
            progress_tick_ms: 100,
            connect_grace_ms: 250,
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("attune");

        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path, or create it if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            // Create default config and save it
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Generate example config content for documentation
    pub fn example_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn volume_debounce(&self) -> Duration {
        Duration::from_millis(self.sync.volume_debounce_ms)
    }

    pub fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.sync.seek_debounce_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.sync.progress_tick_ms)
    }

    pub fn connect_grace(&self) -> Duration {
        Duration::from_millis(self.sync.connect_grace_ms)
    }
}
