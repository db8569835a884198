//! Modelable Loader
//!
//! Applies declarative plugin manifests to a [`modelable_core::Registry`].
//! Manifests are TOML files found under the directories listed in the
//! `[loader]` settings section.

pub mod discovery;
pub mod errors;
pub mod loader;
pub mod manifest;

pub use discovery::{sort_manifests, Discovered, ManifestDiscoverer};
pub use errors::LoaderError;
pub use loader::{ApplySummary, EnumTable, ExtensionLoader, LoadReport, ManifestFailure};
pub use manifest::{BaseEntry, EnumEntry, ModelEntry, PluginManifest, UnionEntry, VariantEntry};
