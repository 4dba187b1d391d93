//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default focus length and the shortest session worth recording
//! - Background sound category, volume and auto-play
//! - Fade and preview timing
//!
//! Configuration is stored at `~/.config/focusroom/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::playback::{PlaybackSettings, SoundCategory};
use crate::session::{MAX_FOCUS_MINUTES, MIN_FOCUS_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Pick the top-ranked task.
    Automatic,
    /// Use the caller's ordering as given.
    Manual,
}

/// Session defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    /// Shorter sessions are reported but not stored.
    #[serde(default = "default_min_recorded")]
    pub min_recorded_minutes: u32,
    #[serde(default = "default_task_mode")]
    pub task_mode: TaskMode,
}

/// Background sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Start the playlist automatically with each session.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Scan this directory instead of the bundled track table.
    #[serde(default)]
    pub music_dir: Option<String>,
}

/// Fade and preview timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,
    #[serde(default = "default_preview_secs")]
    pub preview_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusroom/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sound: SoundConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

// Default functions
fn default_minutes() -> u32 {
    25
}
fn default_min_recorded() -> u32 {
    5
}
fn default_task_mode() -> TaskMode {
    TaskMode::Automatic
}
fn default_category() -> String {
    SoundCategory::LoFi.display_name().into()
}
fn default_volume() -> f64 {
    0.7
}
fn default_fade_ms() -> u64 {
    500
}
fn default_fade_steps() -> u32 {
    10
}
fn default_preview_secs() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            min_recorded_minutes: default_min_recorded(),
            task_mode: default_task_mode(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            category: default_category(),
            volume: default_volume(),
            music_dir: None,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_ms: default_fade_ms(),
            fade_steps: default_fade_steps(),
            preview_secs: default_preview_secs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let fail = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| fail(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| fail(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. The previous value is kept if
    /// the key is unknown or the new value fails validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let minutes = self.session.default_minutes;
        if !(MIN_FOCUS_MINUTES..=MAX_FOCUS_MINUTES).contains(&minutes) {
            return Err(invalid(
                "session.default_minutes",
                format!("must be between {MIN_FOCUS_MINUTES} and {MAX_FOCUS_MINUTES}"),
            ));
        }
        if !(0.0..=1.0).contains(&self.sound.volume) {
            return Err(invalid("sound.volume", "must be between 0 and 1".into()));
        }
        self.sound
            .category
            .parse::<SoundCategory>()
            .map_err(|e| invalid("sound.category", e.to_string()))?;
        if self.playback.fade_steps == 0 {
            return Err(invalid("playback.fade_steps", "must be at least 1".into()));
        }
        Ok(())
    }

    /// Category to play with sessions, or `None` when sound is off.
    pub fn session_sound(&self) -> Option<SoundCategory> {
        if !self.sound.enabled {
            return None;
        }
        self.sound
            .category
            .parse::<SoundCategory>()
            .ok()
            .filter(|c| c.is_audible())
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            fade_duration: Duration::from_millis(self.playback.fade_ms),
            fade_steps: self.playback.fade_steps.max(1),
            preview_window: Duration::from_secs(self.playback.preview_secs),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
