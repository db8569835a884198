//! Utility functions for locating the settings file
//!
//! Resolution order:
//! - `MODELABLE_CONFIG` environment variable (non-empty)
//! - a pointer file `.modelable_config_path` next to the default location
//! - the platform default (`~/.config/modelable/modelable.toml`)

use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the settings file location
pub const CONFIG_ENV_VAR: &str = "MODELABLE_CONFIG";

/// File name of the settings file inside the config directory
pub const CONFIG_FILE_NAME: &str = "modelable.toml";

/// Pointer file that redirects to a settings file elsewhere
pub const POINTER_FILE_NAME: &str = ".modelable_config_path";

/// Error type for settings path resolution
#[derive(Debug, Clone)]
pub enum PathError {
    /// Neither a home nor a config directory could be determined
    NoConfigDir,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::NoConfigDir => write!(f, "Could not determine config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Directory holding modelable's settings and log file
pub fn config_dir() -> Result<PathBuf, PathError> {
    #[cfg(not(target_os = "windows"))]
    let dir = dirs::home_dir()
        .ok_or(PathError::NoConfigDir)?
        .join(".config")
        .join("modelable");

    #[cfg(target_os = "windows")]
    let dir = dirs::config_dir()
        .ok_or(PathError::NoConfigDir)?
        .join("modelable");

    Ok(dir)
}

/// Default settings file path, ignoring overrides
pub fn default_settings_path() -> Result<PathBuf, PathError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the settings file path from the process environment
pub fn settings_path() -> Result<PathBuf, PathError> {
    let env_value = std::env::var(CONFIG_ENV_VAR).ok();
    Ok(resolve_settings_path(
        env_value.as_deref(),
        &default_settings_path()?,
    ))
}

/// Resolve the settings file path from an explicit override and default
///
/// # Arguments
///
/// * `env_value` - Value of `MODELABLE_CONFIG`, if set
/// * `default` - Default settings file location
pub fn resolve_settings_path(env_value: Option<&str>, default: &Path) -> PathBuf {
    if let Some(value) = env_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Some(parent) = default.parent() {
        let pointer = parent.join(POINTER_FILE_NAME);
        if pointer.is_file() {
            if let Ok(contents) = fs::read_to_string(&pointer) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    default.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_override_wins() {
        let default = PathBuf::from("/nonexistent/modelable/modelable.toml");
        let resolved = resolve_settings_path(Some("/tmp/custom.toml"), &default);
        assert_eq!(resolved, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_blank_env_falls_back_to_default() {
        let default = PathBuf::from("/nonexistent/modelable/modelable.toml");
        let resolved = resolve_settings_path(Some("   "), &default);
        assert_eq!(resolved, default);
    }

    #[test]
    fn test_pointer_file_redirects() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let default = temp_dir.path().join(CONFIG_FILE_NAME);
        let target = temp_dir.path().join("elsewhere.toml");
        let written = fs::write(
            temp_dir.path().join(POINTER_FILE_NAME),
            format!("{}\n", target.display()),
        );
        assert!(written.is_ok());

        assert_eq!(resolve_settings_path(None, &default), target);
    }
}
