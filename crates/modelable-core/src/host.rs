//! Schema host seam
//!
//! The registry never owns model definitions. It hands field shapes and
//! defaults to a `SchemaHost` and asks it to rebuild the owning model.
//! `ModelCatalog` is the in-memory host shipped with the crate.

use crate::errors::RegistryError;
use crate::types::{FieldDefault, FieldShape, TypeName};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// The validation/serialization framework that owns model fields
pub trait SchemaHost: Send + Sync {
    /// Whether `owner` is a model whose fields this host can rewrite
    fn accepts_model(&self, owner: &TypeName) -> bool;

    /// Replace the type and default of `owner.field`
    ///
    /// Only called for owners accepted by [`SchemaHost::accepts_model`].
    fn install_field(&self, owner: &TypeName, field: &str, shape: FieldShape, default: FieldDefault);

    /// Make subsequent parse/serialize calls observe installed fields
    fn rebuild(&self, owner: &TypeName);
}

/// A field installed on a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: Arc<str>,
    pub shape: FieldShape,
    pub default: FieldDefault,
}

/// Schema of a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: TypeName,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Bumped on every rebuild
    #[serde(default)]
    pub revision: u64,
}

impl ModelSchema {
    pub fn new(name: TypeName) -> Self {
        ModelSchema {
            name,
            fields: Vec::new(),
            revision: 0,
        }
    }

    #[inline]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| &*spec.name == name)
    }

    fn upsert_field(&mut self, spec: FieldSpec) {
        match self.fields.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
    }
}

/// In-memory schema host
#[derive(Debug, Default)]
pub struct ModelCatalog {
    models: RwLock<AHashMap<TypeName, ModelSchema>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a model; returns `false` if it already exists
    pub fn define_model(&self, name: impl Into<TypeName>) -> bool {
        let name = name.into();
        let mut models = self.models.write();
        if models.contains_key(&name) {
            return false;
        }
        debug!("Defined model '{}'", name);
        models.insert(name.clone(), ModelSchema::new(name));
        true
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    pub fn model(&self, name: &str) -> Option<ModelSchema> {
        self.models.read().get(name).cloned()
    }

    pub fn field(&self, owner: &str, field: &str) -> Option<FieldSpec> {
        self.models
            .read()
            .get(owner)
            .and_then(|model| model.field(field).cloned())
    }

    pub fn revision(&self, owner: &str) -> Option<u64> {
        self.models.read().get(owner).map(|model| model.revision)
    }

    /// Build an instance of `owner`
    ///
    /// Explicit values win; every installed field left out is filled from
    /// its current default. Unknown explicit keys pass through untouched.
    pub fn construct(&self, owner: &str, mut explicit: Map<String, Value>) -> Result<Value, RegistryError> {
        let models = self.models.read();
        let model = models
            .get(owner)
            .ok_or_else(|| RegistryError::UnknownModel(TypeName::new(owner)))?;

        for spec in &model.fields {
            if explicit.contains_key(&*spec.name) {
                continue;
            }
            let value = spec.default.instantiate(&model.name, &spec.name)?;
            explicit.insert(spec.name.to_string(), value);
        }

        Ok(Value::Object(explicit))
    }

    /// Variant type of an explicit field value, using the installed shape
    pub fn dispatch(&self, owner: &str, field: &str, value: &Value) -> Result<TypeName, RegistryError> {
        let spec = self
            .field(owner, field)
            .ok_or_else(|| RegistryError::UnknownModel(TypeName::new(owner)))?;
        spec.shape.dispatch(value).cloned()
    }
}

impl SchemaHost for ModelCatalog {
    fn accepts_model(&self, owner: &TypeName) -> bool {
        self.has_model(owner.as_str())
    }

    fn install_field(&self, owner: &TypeName, field: &str, shape: FieldShape, default: FieldDefault) {
        let mut models = self.models.write();
        if let Some(model) = models.get_mut(owner) {
            model.upsert_field(FieldSpec {
                name: Arc::from(field),
                shape,
                default,
            });
        }
    }

    fn rebuild(&self, owner: &TypeName) {
        let mut models = self.models.write();
        if let Some(model) = models.get_mut(owner) {
            model.revision += 1;
            debug!("Rebuilt model '{}' (revision {})", owner, model.revision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaggedVariant, Template};
    use serde_json::json;

    fn circle_default() -> FieldDefault {
        let mut template = Template::new();
        template.insert("kind".to_string(), json!("circle"));
        FieldDefault::Variant {
            variant: TypeName::new("Circle"),
            tag: Arc::from("circle"),
            template: Arc::new(template),
        }
    }

    #[test]
    fn test_define_model_is_idempotent() {
        let catalog = ModelCatalog::new();
        assert!(catalog.define_model("Canvas"));
        assert!(!catalog.define_model("Canvas"));
        assert!(catalog.accepts_model(&TypeName::new("Canvas")));
        assert!(!catalog.accepts_model(&TypeName::new("Easel")));
    }

    #[test]
    fn test_install_replaces_field_and_rebuild_bumps_revision() {
        let catalog = ModelCatalog::new();
        catalog.define_model("Canvas");
        let owner = TypeName::new("Canvas");

        catalog.install_field(&owner, "item", FieldShape::Unset, FieldDefault::Required);
        catalog.install_field(
            &owner,
            "item",
            FieldShape::Single {
                variant: TypeName::new("Circle"),
            },
            circle_default(),
        );
        catalog.rebuild(&owner);

        assert!(catalog.model("Canvas").is_some_and(|m| m.fields.len() == 1));
        assert!(catalog
            .field("Canvas", "item")
            .is_some_and(|f| f.shape.variant_types().len() == 1));
        assert_eq!(catalog.revision("Canvas"), Some(1));
    }

    #[test]
    fn test_construct_fills_defaults_and_respects_explicit_values() {
        let catalog = ModelCatalog::new();
        catalog.define_model("Canvas");
        let owner = TypeName::new("Canvas");
        catalog.install_field(&owner, "item", FieldShape::Unset, circle_default());

        let built = catalog.construct("Canvas", Map::new());
        assert!(built.is_ok_and(|v| v == json!({"item": {"kind": "circle"}})));

        let mut explicit = Map::new();
        explicit.insert("item".to_string(), json!({"kind": "square"}));
        let built = catalog.construct("Canvas", explicit);
        assert!(built.is_ok_and(|v| v == json!({"item": {"kind": "square"}})));

        assert!(matches!(
            catalog.construct("Easel", Map::new()),
            Err(RegistryError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_dispatch_uses_installed_shape() {
        let catalog = ModelCatalog::new();
        catalog.define_model("Canvas");
        catalog.install_field(
            &TypeName::new("Canvas"),
            "item",
            FieldShape::Tagged {
                tag_field: Arc::from("kind"),
                variants: vec![TaggedVariant {
                    tag: Arc::from("circle"),
                    variant: TypeName::new("Circle"),
                }],
            },
            FieldDefault::Required,
        );

        let dispatched = catalog.dispatch("Canvas", "item", &json!({"kind": "circle"}));
        assert!(dispatched.is_ok_and(|ty| ty.as_str() == "Circle"));
    }
}
