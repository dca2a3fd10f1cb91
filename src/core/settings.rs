// src/core/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{DEFAULT_ICON_RELATIVE, ICON_DOWNLOAD_TIMEOUT_SECS, SETTINGS_FILENAME};
use crate::core::paths::{self, PathError};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not access settings file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize default settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Contents of `settings.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EngineSettings {
    pub icons: IconSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct IconSettings {
    pub download_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<String>,
}

impl Default for IconSettings {
    fn default() -> Self {
        Self {
            download_timeout_secs: ICON_DOWNLOAD_TIMEOUT_SECS,
            cache_dir: None,
            default_icon: None,
        }
    }
}

impl EngineSettings {
    /// Loads `settings.toml` from `config_dir`, writing the defaults there first
    /// if the file does not exist.
    ///
    /// # Errors
    /// I/O failures and malformed TOML are reported; a missing file is not an error.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, SettingsError> {
        let path = config_dir.join(SETTINGS_FILENAME);
        if !path.exists() {
            let defaults = Self::default();
            let text = toml::to_string_pretty(&defaults)?;
            paths::ensure_dir(config_dir)?;
            fs::write(&path, text).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            log::info!("Wrote default settings to '{}'", path.display());
            return Ok(defaults);
        }

        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    /// Download timeout, never zero and never above the hard limit.
    pub fn download_timeout(&self) -> Duration {
        let secs = self
            .icons
            .download_timeout_secs
            .clamp(1, ICON_DOWNLOAD_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// # Errors
    /// Fails when the configured path references an unset variable.
    pub fn icon_cache_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.icons.cache_dir {
            Some(template) => Ok(paths::expand_path(template)?),
            None => Ok(paths::default_icon_cache_dir()),
        }
    }

    /// # Errors
    /// Fails when the configured path references an unset variable.
    pub fn default_icon(&self, base_dir: &Path) -> Result<PathBuf, SettingsError> {
        match &self.icons.default_icon {
            Some(template) => Ok(paths::expand_path(template)?),
            None => Ok(base_dir.join(DEFAULT_ICON_RELATIVE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = EngineSettings::load_or_create(dir.path()).unwrap();
        assert_eq!(settings, EngineSettings::default());

        let written = fs::read_to_string(dir.path().join(SETTINGS_FILENAME)).unwrap();
        assert!(written.contains("download_timeout_secs = 10"));
        assert_eq!(EngineSettings::load_or_create(dir.path()).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            "[icons]\ndefault_icon = \"/opt/icon.png\"\n",
        )
        .unwrap();

        let settings = EngineSettings::load_or_create(dir.path()).unwrap();
        assert_eq!(settings.icons.download_timeout_secs, ICON_DOWNLOAD_TIMEOUT_SECS);
        assert_eq!(
            settings.default_icon(Path::new("/base")).unwrap(),
            PathBuf::from("/opt/icon.png")
        );
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "[icons\n").unwrap();
        let err = EngineSettings::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let mut settings = EngineSettings::default();
        settings.icons.download_timeout_secs = 600;
        assert_eq!(settings.download_timeout(), Duration::from_secs(10));
        settings.icons.download_timeout_secs = 0;
        assert_eq!(settings.download_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_icon_relative_to_base() {
        let settings = EngineSettings::default();
        assert_eq!(
            settings.default_icon(Path::new("/base")).unwrap(),
            Path::new("/base").join(DEFAULT_ICON_RELATIVE)
        );
    }
}
