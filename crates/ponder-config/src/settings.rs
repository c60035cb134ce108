//! The settings file.

use crate::error::ConfigError;
use crate::paths;
use crate::validation::{ValidationResult, validate_settings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Simulated render loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    /// Frames per second.
    pub frame_rate: u32,
    /// Frames to run before exiting; 0 runs until interrupted.
    pub frames: u64,
    /// Frames between positions that need an engine move.
    pub move_interval: u64,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            frames: 600,
            move_interval: 90,
        }
    }
}

/// Background search worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Reference unit search budget in milliseconds.
    pub budget_ms: f64,
    /// Reference unit working memory in bytes.
    pub memory_bytes: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            budget_ms: 250.0,
            memory_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Audio output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Open an output stream at all.
    pub enabled: bool,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Device buffer size in frames.
    pub buffer_size: u32,
    /// Directory of WAV cues; built-in tones when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sounds_dir: Option<PathBuf>,
    /// Output device name filter; system default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 48000,
            buffer_size: 512,
            sounds_dir: None,
            device: None,
        }
    }
}

/// Everything `ponder` reads from its config file.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Render loop settings.
    pub producer: ProducerSettings,
    /// Worker settings.
    pub worker: WorkerSettings,
    /// Audio settings.
    pub audio: AudioSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load the user config file if it exists, otherwise the defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = paths::user_config_file();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading user config");
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "no user config; using defaults");
            Ok(Self::default())
        }
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every rule; see [`validate_settings`].
    pub fn validate(&self) -> ValidationResult<()> {
        validate_settings(self)
    }

    /// Seconds per producer frame.
    pub fn frame_period_secs(&self) -> f64 {
        1.0 / f64::from(self.producer.frame_rate.max(1))
    }
}
