//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/tetrs-arena/settings.toml (or platform equivalent)

use crate::room::RoomOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Server settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gameplay settings applied to every new room
    pub gameplay: GameplaySettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Gameplay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    /// Gravity tick interval in milliseconds
    pub game_speed_ms: u64,
    /// Soft drop step interval in milliseconds
    pub soft_drop_ms: u64,
    /// Speed up gravity as lines are cleared
    pub speed_up: bool,
    /// Lines between speed-ups
    pub speed_up_every_lines: u32,
    /// Floor for the gravity interval in milliseconds
    pub min_game_speed_ms: u64,
    /// Pieces rise from the bottom instead of falling
    pub reverse_gravity: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by RUST_LOG
    pub filter: String,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            game_speed_ms: 1000,
            soft_drop_ms: 50,
            speed_up: false,
            speed_up_every_lines: 10,
            min_game_speed_ms: 100,
            reverse_gravity: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "tetrs_arena=info".to_string(),
        }
    }
}

impl GameplaySettings {
    pub fn soft_drop_interval(&self) -> Duration {
        Duration::from_millis(self.soft_drop_ms.max(1))
    }

    /// Options for a newly created room
    pub fn room_options(&self) -> RoomOptions {
        RoomOptions {
            game_speed: Duration::from_millis(self.game_speed_ms.max(1)),
            speed_up: self.speed_up,
            speed_up_every_lines: self.speed_up_every_lines,
            min_game_speed: Duration::from_millis(self.min_game_speed_ms.max(1)),
            reverse_gravity: self.reverse_gravity,
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "tetrs", "tetrs-arena").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from file, or create default
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_or_create(&path),
            None => Self::default(),
        }
    }

    /// Read settings at `path`. A missing file is written out with the
    /// defaults so there is something to edit.
    pub fn load_or_create(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let settings = Self::default();
                if let Err(e) = settings.save_to(path) {
                    warn!("Could not write default settings: {}", e);
                }
                settings
            }
            Err(e) => {
                warn!("Could not read settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings, falling back to defaults on malformed input
    pub fn from_toml(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_default()
    }

    /// Save settings to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))?;

        fs::write(path, contents).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [gameplay]
            speed_up = true
            "#,
        );
        assert!(settings.gameplay.speed_up);
        assert_eq!(settings.gameplay.game_speed_ms, 1000);
        assert_eq!(settings.logging, LoggingSettings::default());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        assert_eq!(Settings::from_toml("gameplay = 3"), Settings::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut settings = Settings::default();
        settings.gameplay.reverse_gravity = true;
        let text = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(Settings::from_toml(&text), settings);
    }

    #[test]
    fn test_room_options() {
        let gameplay = GameplaySettings {
            game_speed_ms: 500,
            ..GameplaySettings::default()
        };
        let options = gameplay.room_options();
        assert_eq!(options.game_speed, Duration::from_millis(500));
        assert_eq!(options.min_game_speed, Duration::from_millis(100));
        assert_eq!(gameplay.soft_drop_interval(), Duration::from_millis(50));
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tetrs-arena-settings-{}-{}", name, std::process::id()))
            .join("settings.toml")
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let path = scratch_path("create");
        let _ = fs::remove_file(&path);

        let settings = Settings::load_or_create(&path);
        assert_eq!(settings, Settings::default());
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(Settings::from_toml(&written), Settings::default());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_saved_settings_load_back() {
        let path = scratch_path("save");
        let mut settings = Settings::default();
        settings.gameplay.speed_up = true;
        settings.logging.filter = "tetrs_arena=debug".to_string();
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_or_create(&path), settings);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
