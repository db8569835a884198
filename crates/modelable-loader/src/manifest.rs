//! Plugin manifest format
//!
//! A manifest declares models, extensible bases, features and variants for
//! the registry. Everything a plugin would otherwise do with explicit
//! registration calls can be written down here instead.

use crate::errors::LoaderError;
use modelable_core::{ChildDecl, DefaultPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    /// Lower priorities are applied first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub bases: Vec<BaseEntry>,
    #[serde(default)]
    pub enums: Vec<EnumEntry>,
    #[serde(default)]
    pub unions: Vec<UnionEntry>,
    #[serde(default)]
    pub variants: Vec<VariantEntry>,

    /// File the manifest was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub default: DefaultPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub base: String,
    pub name: String,
    /// Members present before any variant registers
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionEntry {
    pub base: String,
    pub owner: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEntry {
    pub name: String,
    pub parent: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

impl VariantEntry {
    pub fn to_decl(&self) -> ChildDecl {
        let mut decl = ChildDecl::new(self.name.as_str()).tags(&self.tags);
        decl.defaults = self.defaults.clone();
        decl
    }
}

impl PluginManifest {
    /// Parse manifest text; `origin` is only used for error reporting
    pub fn parse(content: &str, origin: &Path) -> Result<Self, LoaderError> {
        let mut manifest: PluginManifest =
            toml::from_str(content).map_err(|source| LoaderError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        manifest.source = Some(origin.to_path_buf());
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let content = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Structural checks that need no registry
    pub fn validate(&self) -> Result<(), LoaderError> {
        let invalid = |reason: String| LoaderError::InvalidManifest {
            manifest: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("manifest name cannot be empty".to_string()));
        }
        if let Some(model) = self.models.iter().find(|m| m.name.trim().is_empty()) {
            return Err(invalid(format!("model entry '{}' has no name", model.name)));
        }
        if let Some(variant) = self.variants.iter().find(|v| v.name.trim().is_empty()) {
            return Err(invalid(format!(
                "variant declared under '{}' has no name",
                variant.parent
            )));
        }
        Ok(())
    }

    /// Number of declarations in the manifest
    pub fn declaration_count(&self) -> usize {
        self.models.len()
            + self.bases.len()
            + self.enums.len()
            + self.unions.len()
            + self.variants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    const SHAPES: &str = r#"
name = "shapes-core"
priority = 0

[[models]]
name = "Canvas"

[[bases]]
name = "Shape"
discriminator = "kind"
default = { policy = "predetermined", tag = "circle" }

[[enums]]
base = "Shape"
name = "ShapeKind"

[[unions]]
base = "Shape"
owner = "Canvas"
field = "item"

[[variants]]
name = "Circle"
parent = "Shape"
tags = ["circle", "round"]
defaults = { radius = 1.0 }
"#;

    #[test]
    fn test_parse_full_manifest() {
        let parsed = PluginManifest::parse(SHAPES, Path::new("shapes.toml"));
        let Ok(manifest) = parsed else {
            panic!("manifest should parse: {parsed:?}");
        };

        assert_eq!(manifest.name, "shapes-core");
        assert_eq!(manifest.declaration_count(), 5);
        assert_eq!(
            manifest.bases[0].default,
            DefaultPolicy::Predetermined(Arc::from("circle"))
        );
        assert!(manifest.enums[0].values.is_empty());

        let decl = manifest.variants[0].to_decl();
        assert_eq!(decl.tags.len(), 2);
        assert_eq!(decl.defaults.get("radius"), Some(&json!(1.0)));
    }

    #[test]
    fn test_base_defaults_to_no_policy() {
        let content = "name = \"markers\"\n[[bases]]\nname = \"Marker\"\n";
        let parsed = PluginManifest::parse(content, Path::new("markers.toml"));
        assert!(parsed.is_ok_and(|m| m.bases[0].default == DefaultPolicy::None
            && m.bases[0].discriminator.is_none()));
    }

    #[test]
    fn test_rejects_malformed_manifests() {
        assert!(matches!(
            PluginManifest::parse("priority = 1", Path::new("a.toml")),
            Err(LoaderError::Parse { .. })
        ));
        assert!(matches!(
            PluginManifest::parse("name = \" \"", Path::new("b.toml")),
            Err(LoaderError::InvalidManifest { .. })
        ));
        assert!(matches!(
            PluginManifest::from_path(Path::new("/nonexistent/c.toml")),
            Err(LoaderError::Io { .. })
        ));
    }
}
