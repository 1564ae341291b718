//! Configuration loading for baton.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Roster;
use crate::error::{Error, Result};

/// Get the baton home directory (~/.baton).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".baton"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.baton/settings.json, or defaults if the file is absent.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write settings as pretty JSON, creating the parent directory.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    validate_settings(settings)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    tracing::info!("Wrote settings to {}", path.display());
    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.preview_chars == 0 {
        return Err(Error::Config(
            "preview_chars must be greater than zero".to_string(),
        ));
    }
    if settings.roster.is_empty() {
        tracing::warn!("Roster is empty; turns will not produce any messages");
    }
    Ok(())
}

/// baton settings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    /// SQLite file; defaults to ~/.baton/baton.db.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub roster: Roster,

    /// Pause between agents within a turn.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    /// Characters of content shown per history line.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_turn_delay_ms() -> u64 {
    500
}

fn default_preview_chars() -> usize {
    50
}

impl Settings {
    /// Configured database path, or the default under the home directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_home_dir()?.join("baton.db")),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            roster: Roster::default(),
            turn_delay_ms: default_turn_delay_ms(),
            preview_chars: default_preview_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.roster, Roster::default());
        assert_eq!(settings.turn_delay_ms, 500);
        assert_eq!(settings.preview_chars, 50);
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"roster": ["A", "B"], "turn_delay_ms": 0}"#).unwrap();

        let settings = load_settings_from(&path).unwrap();

        assert_eq!(settings.roster, Roster::new(["A", "B"]));
        assert_eq!(settings.turn_delay_ms, 0);
        assert_eq!(settings.preview_chars, 50);
    }

    #[test]
    fn test_invalid_preview_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"preview_chars": 0}"#).unwrap();

        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            database_path: Some(dir.path().join("custom.db")),
            ..Settings::default()
        };

        save_settings(&settings, &path).unwrap();
        let loaded = load_settings_from(&path).unwrap();

        assert_eq!(loaded.database_path().unwrap(), dir.path().join("custom.db"));
    }
}
