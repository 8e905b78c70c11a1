//! Settings loading.
//!
//! Settings live in a TOML file managed through `confy`. A missing file is
//! created with defaults; a malformed file is reported and replaced by
//! defaults in memory, never propagated as a hard failure.

use std::path::{Path, PathBuf};

use resona_types::Settings;

use crate::error::ConfigError;

const APP_NAME: &str = "resona";
const SETTINGS_FILE: &str = "settings.toml";

/// Default settings location: `<config dir>/resona/settings.toml`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME).join(SETTINGS_FILE))
}

/// Load settings from the platform config directory, defaulting on any failure.
pub fn load_settings() -> Settings {
    match default_settings_path() {
        Some(path) => load_settings_from(&path),
        None => {
            tracing::warn!("No config directory available, using default settings");
            Settings::default()
        }
    }
}

/// Load settings from `path`, defaulting on any failure.
pub fn load_settings_from(path: &Path) -> Settings {
    match try_load_settings_from(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        }
    }
}

pub fn try_load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    confy::load_path(path).map_err(|source| ConfigError::Confy {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    confy::store_path(path, settings).map_err(|source| ConfigError::Confy {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "auto_clear_on_timeout = \"sometimes\"\n").unwrap();

        assert!(try_load_settings_from(&path).is_err());
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_settings_keep_given_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "fight_log = true\ntimeout_clear_ms = 5000\n").unwrap();

        let settings = load_settings_from(&path);
        assert!(settings.fight_log);
        assert_eq!(settings.timeout_clear_ms, 5000);
        assert!(settings.save_history);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let settings = Settings {
            auto_clear_on_timeout: true,
            log_dir: dir.path().join("history"),
            ..Settings::default()
        };

        save_settings_to(&path, &settings).unwrap();
        assert_eq!(try_load_settings_from(&path).unwrap(), settings);
    }
}
