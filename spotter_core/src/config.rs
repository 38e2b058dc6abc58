//! Configuration file support for Spotter.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/spotter/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Countdown lengths used by the progression engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Interval for a rep-based set (no prescribed duration)
    #[serde(default = "default_exercise_seconds")]
    pub default_exercise_seconds: u32,

    /// Rest used when a prescription omits `rest_seconds`
    #[serde(default = "default_rest_seconds")]
    pub default_rest_seconds: u32,

    /// Floor for the rest between two exercises
    #[serde(default = "default_min_transition_rest_seconds")]
    pub min_transition_rest_seconds: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_exercise_seconds: default_exercise_seconds(),
            default_rest_seconds: default_rest_seconds(),
            min_transition_rest_seconds: default_min_transition_rest_seconds(),
        }
    }
}

/// Audio cue configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_audio_enabled")]
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("spotter")
}

fn default_exercise_seconds() -> u32 {
    30
}

fn default_rest_seconds() -> u32 {
    60
}

fn default_min_transition_rest_seconds() -> u32 {
    120
}

fn default_audio_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject timing values that would make the countdown meaningless
    pub fn validate(&self) -> Result<()> {
        if self.timing.default_exercise_seconds == 0 {
            return Err(Error::Config(
                "timing.default_exercise_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("spotter").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Outbox file the CLI submits finished session logs to
    pub fn outbox_path(&self) -> PathBuf {
        self.data.data_dir.join("logs").join("session_logs.jsonl")
    }
}
