//! Plugin manifest discovery
//!
//! Walks the configured manifest directories once, reads every file with the
//! manifest extension and orders the parsed manifests by `(priority, name)`.

use crate::errors::LoaderError;
use crate::manifest::PluginManifest;
use modelable_config::LoaderSettings;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct ManifestDiscoverer {
    roots: Vec<PathBuf>,
    extension: String,
}

/// Manifests found under the roots, plus the files that failed to read
#[derive(Debug, Default)]
pub struct Discovered {
    pub manifests: Vec<PluginManifest>,
    pub failures: Vec<LoaderError>,
}

impl ManifestDiscoverer {
    pub fn new(roots: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        ManifestDiscoverer {
            roots,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_settings(settings: &LoaderSettings) -> Self {
        Self::new(settings.manifest_dirs.clone(), settings.extension.as_str())
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
    }

    /// Manifest files under every root, sorted by path within each root
    pub fn find_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            if !root.exists() {
                warn!("Manifest directory not found: {}", root.display());
                continue;
            }

            let mut found: Vec<PathBuf> = WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| !Self::is_hidden(entry))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| self.has_extension(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();

            debug!("Found {} manifest(s) under {}", found.len(), root.display());
            files.extend(found);
        }
        files
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
    }

    /// Parse every manifest file, in application order
    pub fn discover(&self) -> Discovered {
        let mut discovered = Discovered::default();
        for path in self.find_files() {
            match PluginManifest::from_path(&path) {
                Ok(manifest) => discovered.manifests.push(manifest),
                Err(e) => {
                    warn!("Skipping manifest {}: {}", path.display(), e);
                    discovered.failures.push(e);
                }
            }
        }
        sort_manifests(&mut discovered.manifests);
        discovered
    }
}

/// Application order: ascending priority, then name
pub fn sort_manifests(manifests: &mut [PluginManifest]) {
    manifests.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
}
