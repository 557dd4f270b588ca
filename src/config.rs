use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::features::LogMelConfig;
use crate::window::WindowSettings;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    // Window geometry and timing
    pub window: WindowSettings,

    // Quantization range of the log-mel features
    pub log_floor: f32,
    pub log_ceiling: f32,

    // Replay
    /// Audio fed to the window between updates
    pub chunk_ms: u32,
    /// How much audio the history keeps
    pub history_ms: u32,
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        let mel = LogMelConfig::default();
        Self {
            schema_version: 1,
            window: WindowSettings::default(),
            log_floor: mel.log_floor,
            log_ceiling: mel.log_ceiling,
            chunk_ms: 100,
            history_ms: 2000,
            output_format: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".feature-window"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Extractor settings matching the configured window
    pub fn log_mel(&self) -> LogMelConfig {
        LogMelConfig {
            log_floor: self.log_floor,
            log_ceiling: self.log_ceiling,
            ..LogMelConfig::for_window(&self.window)
        }
    }

    /// Check the settings before any audio is processed
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        if (self.chunk_ms as i64) < self.window.slice_duration_ms {
            anyhow::bail!(
                "chunk of {}ms is shorter than one {}ms slice",
                self.chunk_ms,
                self.window.slice_duration_ms
            );
        }
        if (self.history_ms as i64) < self.window.window_duration_ms() {
            anyhow::bail!(
                "history of {}ms can't hold a {}ms window",
                self.history_ms,
                self.window.window_duration_ms()
            );
        }
        Ok(())
    }
}

/// How update records are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
