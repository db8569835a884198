//! Typed settings loaded from `modelable.toml`

use crate::paths::{self, PathError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How the registry treats a variant that is registered twice
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateChildren {
    /// Reject the second registration
    #[default]
    Error,
    /// Accept an identical re-registration as a no-op
    Ignore,
}

impl DuplicateChildren {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateChildren::Error => "error",
            DuplicateChildren::Ignore => "ignore",
        }
    }
}

impl std::str::FromStr for DuplicateChildren {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "error" => Ok(DuplicateChildren::Error),
            "ignore" => Ok(DuplicateChildren::Ignore),
            other => Err(ConfigError::InvalidValue {
                key: "duplicate-children".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrySettings {
    pub duplicate_children: DuplicateChildren,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// 0 = warnings only, 1 = debug, 2 = trace
    pub verbosity: u8,
    pub no_stdout: bool,
    /// Log file location; `modelable.log` in the config directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderSettings {
    pub manifest_dirs: Vec<PathBuf>,
    /// File extension of plugin manifests, without the dot
    pub extension: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        LoaderSettings {
            manifest_dirs: Vec::new(),
            extension: "toml".to_string(),
        }
    }
}

/// Top-level settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub logging: LoggingSettings,
    pub loader: LoaderSettings,
}

/// Errors raised while reading, writing or editing settings
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Path(PathError),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse settings: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize settings: {}", e),
            ConfigError::Path(e) => write!(f, "{}", e),
            ConfigError::UnknownKey(key) => write!(f, "Unknown settings key '{}'", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{}' for settings key '{}'", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            ConfigError::Path(e) => Some(e),
            ConfigError::UnknownKey(_) | ConfigError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialize(err)
    }
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        ConfigError::Path(err)
    }
}

/// Keys accepted by [`Settings::get`] and [`Settings::set`]
pub const KEYS: &[&str] = &[
    "duplicate-children",
    "verbosity",
    "no-stdout",
    "log-file",
    "manifest-dirs",
    "extension",
];

impl Settings {
    /// Load settings from the resolved location, defaulting when absent
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::settings_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = paths::settings_path()?;
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "duplicate-children" => Some(self.registry.duplicate_children.as_str().to_string()),
            "verbosity" => Some(self.logging.verbosity.to_string()),
            "no-stdout" => Some(self.logging.no_stdout.to_string()),
            "log-file" => Some(
                self.logging
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            "manifest-dirs" => Some(
                self.loader
                    .manifest_dirs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            "extension" => Some(self.loader.extension.clone()),
            _ => None,
        }
    }

    /// Set a value by flat key. `manifest-dirs` takes a comma separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "duplicate-children" => self.registry.duplicate_children = value.parse()?,
            "verbosity" => self.logging.verbosity = value.trim().parse().map_err(|_| invalid())?,
            "no-stdout" => self.logging.no_stdout = value.trim().parse().map_err(|_| invalid())?,
            "log-file" => {
                let path = value.trim();
                self.logging.log_file = (!path.is_empty()).then(|| PathBuf::from(path));
            }
            "manifest-dirs" => {
                self.loader.manifest_dirs = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect();
            }
            "extension" => {
                let ext = value.trim().trim_start_matches('.');
                if ext.is_empty() {
                    return Err(invalid());
                }
                self.loader.extension = ext.to_string();
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = Settings::load_from_path(Path::new("/nonexistent/modelable.toml"));
        assert!(settings.is_ok_and(|s| s == Settings::default()));
    }

    #[test]
    fn test_partial_document() {
        let Ok(settings) = toml::from_str::<Settings>(
            r#"
            [registry]
            duplicate_children = "ignore"
            "#,
        ) else {
            panic!("partial settings should parse");
        };
        assert_eq!(
            settings.registry.duplicate_children,
            DuplicateChildren::Ignore
        );
        assert_eq!(settings.loader.extension, "toml");
        assert_eq!(settings.logging.verbosity, 0);
    }

    #[test]
    fn test_save_and_load() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("nested").join("modelable.toml");

        let mut settings = Settings::default();
        assert!(settings.set("verbosity", "2").is_ok());
        assert!(settings.set("log-file", "logs/modelable.log").is_ok());
        assert!(settings.set("manifest-dirs", "plugins, vendor/plugins").is_ok());
        assert!(settings.save_to_path(&path).is_ok());

        let loaded = Settings::load_from_path(&path);
        assert!(loaded.is_ok_and(|s| s == settings));

        assert!(settings.set("log-file", "").is_ok());
        assert!(settings.logging.log_file.is_none());
        assert_eq!(settings.get("log-file").as_deref(), Some(""));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("duplicate-children", "sometimes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("verbosity", "loud"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("colour", "blue"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_values_iter_lists_every_key() {
        let settings = Settings::default();
        let keys: Vec<&str> = settings.values_iter().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, KEYS);
    }
}
