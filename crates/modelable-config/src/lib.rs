//! Settings management for the modelable extension registry
//!
//! Settings live in a single TOML file. The registry reads its duplicate
//! handling from it, the logger its verbosity, and the loader the directories
//! to scan for plugin manifests.

pub mod paths;
pub mod settings;

pub use paths::{config_dir, settings_path, PathError, CONFIG_ENV_VAR};
pub use settings::{
    ConfigError, DuplicateChildren, LoaderSettings, LoggingSettings, RegistrySettings, Settings,
};
