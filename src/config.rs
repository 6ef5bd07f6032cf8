//! User configuration.
//!
//! Read from `~/.config/codio/config.toml` (platform equivalent via
//! `dirs`). Every field has a default, so a missing file or a partially
//! filled one both work.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default clock tick cadence in milliseconds.
const DEFAULT_TICK_INTERVAL_MS: u64 = 250;

/// Default audio player invocation. `{offset}` is seconds into the track,
/// `{file}` the narration file path.
const DEFAULT_AUDIO_PLAYER: &str =
    "ffplay -nodisp -autoexit -loglevel quiet -ss {offset} {file}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Folder that holds unpacked codios.
    pub codios_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            codios_dir: home.join("codio").join("codios"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress clock tick cadence in milliseconds.
    pub tick_interval_ms: u64,
    /// Command template used to play the narration track.
    pub audio_player: String,
    /// Skip the narration track entirely.
    pub no_audio: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            audio_player: DEFAULT_AUDIO_PLAYER.to_string(),
            no_audio: false,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("codio").join("config.toml"))
    }

    /// Load the config file, falling back to defaults if it is absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Malformed config: {}", path.display()))
    }

    /// Write the config file, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.playback.tick_interval_ms)
    }
}
