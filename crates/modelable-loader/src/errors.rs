use modelable_core::RegistryError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or applying plugin manifests
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid manifest '{manifest}': {reason}")]
    InvalidManifest { manifest: String, reason: String },

    #[error("Manifest '{0}' was already applied")]
    DuplicateManifest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
