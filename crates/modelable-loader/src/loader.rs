//! Extension loader
//!
//! Drives the registry from plugin manifests. Within a manifest, declarations
//! are applied as models, bases, enums, unions, then variants. A manifest that
//! fails stops at the failing declaration and is reported; manifests after it
//! still load. Declarations applied before the failure stay registered.

use crate::discovery::{sort_manifests, ManifestDiscoverer};
use crate::errors::LoaderError;
use crate::manifest::PluginManifest;
use ahash::{AHashMap, AHashSet};
use modelable_config::{LoaderSettings, Settings};
use modelable_core::{DynamicEnum, ExtensibleEnum, ModelCatalog, Registry};
use modelable_logger as logger;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Enumerations created from manifests
///
/// The registry only holds weak references to enums, so the loader keeps
/// them alive for as long as it lives.
#[derive(Debug, Default)]
pub struct EnumTable {
    enums: AHashMap<String, Arc<DynamicEnum>>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<DynamicEnum>> {
        self.enums.get(name).cloned()
    }

    fn insert(&mut self, name: &str, target: Arc<DynamicEnum>) {
        self.enums.insert(name.to_string(), target);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.enums.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }
}

/// Declarations applied from one manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub models: usize,
    pub bases: usize,
    pub enums: usize,
    pub unions: usize,
    pub variants: usize,
}

#[derive(Debug)]
pub struct ManifestFailure {
    /// Manifest name, or the file path when it could not be parsed
    pub manifest: String,
    pub error: LoaderError,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub applied: Vec<(String, ApplySummary)>,
    pub failed: Vec<ManifestFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn applied_names(&self) -> Vec<&str> {
        self.applied.iter().map(|(name, _)| name.as_str()).collect()
    }
}

pub struct ExtensionLoader {
    registry: Arc<Registry>,
    catalog: Arc<ModelCatalog>,
    settings: LoaderSettings,
    enums: EnumTable,
    applied: AHashSet<String>,
}

impl ExtensionLoader {
    /// Loader with a fresh registry whose schema host is `catalog`
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        let registry = Arc::new(Registry::new(catalog.clone()));
        Self::build(registry, catalog, LoaderSettings::default())
    }

    /// Loader configured from a full settings document
    ///
    /// The `[registry]` section configures the registry, `[loader]` the
    /// manifest discovery and `[logging]` the logger.
    pub fn with_settings(catalog: Arc<ModelCatalog>, settings: &Settings) -> Self {
        if let Err(e) = logger::init_from_settings(&settings.logging) {
            warn!("Logger setup failed: {}", e);
        }
        let registry = Arc::new(Registry::with_settings(catalog.clone(), &settings.registry));
        Self::build(registry, catalog, settings.loader.clone())
    }

    fn build(registry: Arc<Registry>, catalog: Arc<ModelCatalog>, settings: LoaderSettings) -> Self {
        ExtensionLoader {
            registry,
            catalog,
            settings,
            enums: EnumTable::new(),
            applied: AHashSet::new(),
        }
    }

    /// Registry driven by this loader; bases may also be registered on it in code
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn enums(&self) -> &EnumTable {
        &self.enums
    }

    /// Discover manifests under the configured directories and apply them
    pub fn load_all(&mut self) -> LoadReport {
        let discoverer = ManifestDiscoverer::from_settings(&self.settings);
        self.load_discovered(&discoverer)
    }

    /// Discover manifests under `roots` and apply them
    pub fn load_from(&mut self, roots: &[PathBuf]) -> LoadReport {
        let discoverer = ManifestDiscoverer::new(roots.to_vec(), self.settings.extension.as_str());
        self.load_discovered(&discoverer)
    }

    fn load_discovered(&mut self, discoverer: &ManifestDiscoverer) -> LoadReport {
        let discovered = discoverer.discover();

        let mut report = self.load_manifests(discovered.manifests);
        for error in discovered.failures {
            let manifest = match &error {
                LoaderError::Io { path, .. } | LoaderError::Parse { path, .. } => {
                    path.display().to_string()
                }
                other => other.to_string(),
            };
            logger::error(&format!("Failed to read manifest {}: {}", manifest, error));
            report.failed.push(ManifestFailure { manifest, error });
        }
        report
    }

    /// Apply already parsed manifests in `(priority, name)` order
    pub fn load_manifests(&mut self, mut manifests: Vec<PluginManifest>) -> LoadReport {
        sort_manifests(&mut manifests);
        let mut report = LoadReport::default();

        for manifest in &manifests {
            match self.apply(manifest) {
                Ok(summary) => report.applied.push((manifest.name.clone(), summary)),
                Err(error) => {
                    logger::error(&format!("Manifest '{}' failed: {}", manifest.name, error));
                    report.failed.push(ManifestFailure {
                        manifest: manifest.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Loaded {} manifest(s), {} failed",
            report.applied.len(),
            report.failed.len()
        );
        report
    }

    /// Apply one manifest
    pub fn apply(&mut self, manifest: &PluginManifest) -> Result<ApplySummary, LoaderError> {
        manifest.validate()?;
        if self.applied.contains(&manifest.name) {
            return Err(LoaderError::DuplicateManifest(manifest.name.clone()));
        }

        logger::set_current_manifest(Some(manifest.name.clone()));
        let result = self.apply_declarations(manifest);
        logger::set_current_manifest(None);

        let summary = result?;
        self.applied.insert(manifest.name.clone());
        logger::success(&format!(
            "Applied manifest '{}' ({} declarations)",
            manifest.name,
            manifest.declaration_count()
        ));
        Ok(summary)
    }

    fn apply_declarations(&mut self, manifest: &PluginManifest) -> Result<ApplySummary, LoaderError> {
        let mut summary = ApplySummary::default();

        for model in &manifest.models {
            if self.catalog.define_model(model.name.as_str()) {
                logger::step(&format!("Defined model {}", model.name));
            } else {
                debug!("Model '{}' already defined", model.name);
            }
            summary.models += 1;
        }

        for base in &manifest.bases {
            self.registry.register_base(
                base.name.as_str(),
                base.discriminator.as_deref(),
                base.default.clone(),
            )?;
            logger::step(&format!("Registered base {}", base.name));
            summary.bases += 1;
        }

        for entry in &manifest.enums {
            let existing = self.enums.get(&entry.name);
            let created = existing.is_none();
            let target = existing.unwrap_or_else(|| Arc::new(DynamicEnum::new(&entry.name)));

            // nothing is kept or seeded until the registry accepts the enum
            let handle: Arc<dyn ExtensibleEnum> = target.clone();
            self.registry.declare_enum_feature(&entry.base, &handle)?;
            for value in &entry.values {
                target.insert_member(value, value);
            }
            if created {
                self.enums.insert(&entry.name, target);
            }
            logger::step(&format!("Declared enum {} on {}", entry.name, entry.base));
            summary.enums += 1;
        }

        for entry in &manifest.unions {
            self.registry
                .declare_union_feature(&entry.base, &entry.field, entry.owner.as_str())?;
            logger::step(&format!(
                "Declared union {}.{} on {}",
                entry.owner, entry.field, entry.base
            ));
            summary.unions += 1;
        }

        for variant in &manifest.variants {
            let scope = self
                .registry
                .register_child(variant.parent.as_str(), variant.to_decl())?;
            logger::step(&format!("Registered variant {} under {}", variant.name, scope));
            summary.variants += 1;
        }

        Ok(summary)
    }
}
