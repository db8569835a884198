//! Registry snapshot export
//!
//! A point-in-time, serializable view of every base with its variants and
//! features. Written for inspection and debugging; a snapshot is never loaded
//! back into a registry.
//!
//! TOML has no null, so the on-disk form drops null values from default
//! templates. The JSON export keeps them.

use crate::errors::SnapshotError;
use crate::types::{ChildType, DefaultPolicy, FieldDefault, FieldShape, Tag, TypeName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub generated_at: String,
    #[serde(default)]
    pub bases: Vec<BaseSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSnapshot {
    pub name: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_key: Option<Arc<str>>,
    pub default_policy: DefaultPolicy,
    #[serde(default)]
    pub variants: Vec<ChildType>,
    #[serde(default)]
    pub unions: Vec<UnionSnapshot>,
    #[serde(default)]
    pub enums: Vec<EnumSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionSnapshot {
    pub owner: TypeName,
    pub field: Arc<str>,
    pub discriminated: bool,
    pub shape: FieldShape,
    pub default: FieldDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSnapshot {
    pub name: Arc<str>,
    pub alive: bool,
    #[serde(default)]
    pub values: Vec<Tag>,
}

impl RegistrySnapshot {
    pub fn new(bases: Vec<BaseSnapshot>) -> Self {
        RegistrySnapshot {
            generated_at: chrono::Utc::now().to_rfc3339(),
            bases,
        }
    }

    pub fn base(&self, name: &str) -> Option<&BaseSnapshot> {
        self.bases.iter().find(|b| b.name.as_str() == name)
    }

    pub fn to_json_string(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_path(&self, output_path: &Path) -> Result<(), SnapshotError> {
        debug!("Writing registry snapshot to: {:?}", output_path);

        let mut value = serde_json::to_value(self)?;
        strip_nulls(&mut value);
        let toml_string = toml::to_string_pretty(&value)?;
        fs::write(output_path, &toml_string)?;

        info!("Registry snapshot written to: {:?}", output_path);
        info!("Total bases: {}", self.bases.len());

        Ok(())
    }

    pub fn read_from_path(snapshot_path: &Path) -> Result<Self, SnapshotError> {
        debug!("Reading registry snapshot from: {:?}", snapshot_path);

        let content = fs::read_to_string(snapshot_path)?;
        let snapshot: RegistrySnapshot = toml::from_str(&content)?;

        info!("Snapshot generated at: {}", snapshot.generated_at);
        Ok(snapshot)
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(strip_nulls);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaggedVariant;
    use smallvec::smallvec;
    use tempfile::TempDir;

    fn sample() -> RegistrySnapshot {
        RegistrySnapshot::new(vec![BaseSnapshot {
            name: TypeName::new("Shape"),
            discriminator_key: Some(Arc::from("kind")),
            default_policy: DefaultPolicy::Predetermined(Arc::from("circle")),
            variants: vec![ChildType {
                name: TypeName::new("Circle"),
                base: TypeName::new("Shape"),
                parent: TypeName::new("Shape"),
                tags: smallvec![Arc::from("circle")],
                defaults: Arc::default(),
            }],
            unions: vec![UnionSnapshot {
                owner: TypeName::new("Canvas"),
                field: Arc::from("item"),
                discriminated: true,
                shape: FieldShape::Tagged {
                    tag_field: Arc::from("kind"),
                    variants: vec![TaggedVariant {
                        tag: Arc::from("circle"),
                        variant: TypeName::new("Circle"),
                    }],
                },
                default: FieldDefault::Unresolved {
                    tag: Some(Arc::from("circle")),
                },
            }],
            enums: vec![EnumSnapshot {
                name: Arc::from("ShapeKind"),
                alive: true,
                values: vec![Arc::from("circle")],
            }],
        }])
    }

    #[test]
    fn test_write_and_read_custom_path() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("snapshot.toml");
        let snapshot = sample();

        assert!(snapshot.write_to_path(&path).is_ok(), "Failed to write snapshot");
        assert!(path.exists());

        let Ok(loaded) = RegistrySnapshot::read_from_path(&path) else {
            panic!("Failed to read snapshot back");
        };
        assert_eq!(loaded, snapshot);
        assert!(loaded.base("Shape").is_some_and(|b| b.enums[0].values.len() == 1));
    }

    #[test]
    fn test_null_defaults_are_dropped_on_disk() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("snapshot.toml");
        let mut snapshot = sample();
        let mut template = serde_json::Map::new();
        template.insert("radius".to_string(), serde_json::json!(1.0));
        template.insert("label".to_string(), Value::Null);
        template.insert("points".to_string(), serde_json::json!([1, null, 2]));
        snapshot.bases[0].variants[0].defaults = Arc::new(template);

        let written = snapshot.write_to_path(&path);
        assert!(written.is_ok(), "null default broke the export: {written:?}");

        let Ok(loaded) = RegistrySnapshot::read_from_path(&path) else {
            panic!("Failed to read snapshot back");
        };
        let defaults = &loaded.bases[0].variants[0].defaults;
        assert!(!defaults.contains_key("label"));
        assert_eq!(defaults.get("radius"), Some(&serde_json::json!(1.0)));
        assert_eq!(defaults.get("points"), Some(&serde_json::json!([1, 2])));

        assert!(snapshot
            .to_json_string()
            .is_ok_and(|json| json.contains("\"label\": null")));
    }

    #[test]
    fn test_json_export_names_policy() {
        let Ok(json) = sample().to_json_string() else {
            panic!("JSON export failed");
        };
        assert!(json.contains("\"policy\": \"predetermined\""));
        assert!(json.contains("\"tag_field\": \"kind\""));
    }

    #[test]
    fn test_read_missing_file() {
        let result = RegistrySnapshot::read_from_path(Path::new("/nonexistent/snapshot.toml"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }
}
