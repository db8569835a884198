//! Core data model for the extension registry
//!
//! This module provides:
//! - `TypeName`, an interned type identity used as map key everywhere
//! - base/variant records kept by the subtype graph
//! - the field shape and default descriptors handed to the schema host

use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// A single discriminator literal
pub type Tag = Arc<str>;

/// Discriminator literals declared by one variant, in declaration order
pub type Tags = SmallVec<[Tag; 2]>;

/// Field defaults of a variant, used to build default instances
pub type Template = Map<String, Value>;

// =============================================================================
// TYPE NAME
// =============================================================================

/// Identity of a type taking part in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        TypeName(Arc::from(name.as_ref()))
    }

    /// Identity of a Rust type, from its fully qualified path
    pub fn of<T: ?Sized>() -> Self {
        TypeName::new(std::any::type_name::<T>())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName(Arc::from(name))
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

// =============================================================================
// DEFAULT POLICY
// =============================================================================

/// Which variant a union field falls back to when no value is given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "tag", rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// The field is required
    #[default]
    None,
    /// The earliest registered variant
    FirstRegistered,
    /// The most recently registered variant
    LastRegistered,
    /// The variant carrying this tag, once it registers
    Predetermined(Tag),
}

// =============================================================================
// GRAPH RECORDS
// =============================================================================

/// A type declared extensible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseType {
    pub name: TypeName,
    pub discriminator_key: Option<Arc<str>>,
    pub default_policy: DefaultPolicy,
    /// Variants in registration order
    pub children: Vec<TypeName>,
}

/// A registered variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildType {
    pub name: TypeName,
    /// Scope the variant joined (its nearest extensible ancestor)
    pub base: TypeName,
    /// Type the variant was declared under
    pub parent: TypeName,
    pub tags: Tags,
    #[serde(default)]
    pub defaults: Arc<Template>,
}

impl ChildType {
    /// Tag used when this variant is instantiated without an explicit one
    pub fn primary_tag(&self) -> Option<&Tag> {
        self.tags.first()
    }
}

/// Declaration of a new variant, as supplied by a plugin
#[derive(Debug, Clone, PartialEq)]
pub struct ChildDecl {
    pub name: TypeName,
    pub tags: Tags,
    pub defaults: Template,
}

impl ChildDecl {
    pub fn new(name: impl Into<TypeName>) -> Self {
        ChildDecl {
            name: name.into(),
            tags: Tags::new(),
            defaults: Template::new(),
        }
    }

    /// Add one discriminator literal
    pub fn tag(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.push(Arc::from(tag.as_ref()));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|tag| Arc::from(tag.as_ref())));
        self
    }

    /// Default value for one of the variant's own fields
    pub fn default_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(field.into(), value);
        self
    }
}

// =============================================================================
// FIELD DESCRIPTORS
// =============================================================================

/// One `(tag, variant)` entry of a union's variant set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedVariant {
    pub tag: Tag,
    pub variant: TypeName,
}

/// Type descriptor installed on a union field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldShape {
    /// No variant registered yet
    #[default]
    Unset,
    /// Exactly one variant; no tag metadata
    Single { variant: TypeName },
    /// Discriminated union dispatched on `tag_field`
    Tagged {
        tag_field: Arc<str>,
        variants: Vec<TaggedVariant>,
    },
}

impl FieldShape {
    pub fn is_discriminated(&self) -> bool {
        matches!(self, FieldShape::Tagged { .. })
    }

    pub fn tag_field(&self) -> Option<&str> {
        match self {
            FieldShape::Tagged { tag_field, .. } => Some(tag_field),
            FieldShape::Unset | FieldShape::Single { .. } => None,
        }
    }

    /// Distinct variant types, in order of first appearance
    pub fn variant_types(&self) -> Vec<&TypeName> {
        match self {
            FieldShape::Unset => Vec::new(),
            FieldShape::Single { variant } => vec![variant],
            FieldShape::Tagged { variants, .. } => {
                let mut types: Vec<&TypeName> = Vec::with_capacity(variants.len());
                for entry in variants {
                    if !types.contains(&&entry.variant) {
                        types.push(&entry.variant);
                    }
                }
                types
            }
        }
    }

    pub fn tags(&self) -> Vec<&str> {
        match self {
            FieldShape::Tagged { variants, .. } => {
                variants.iter().map(|entry| &*entry.tag).collect()
            }
            FieldShape::Unset | FieldShape::Single { .. } => Vec::new(),
        }
    }

    /// Pick the variant type a value belongs to
    ///
    /// A single-variant shape accepts any value; a discriminated shape reads
    /// the tag field of a JSON object.
    pub fn dispatch(&self, value: &Value) -> Result<&TypeName, RegistryError> {
        match self {
            FieldShape::Unset => Err(RegistryError::UnknownTag {
                tag_field: String::new(),
                tag: value.to_string(),
            }),
            FieldShape::Single { variant } => Ok(variant),
            FieldShape::Tagged {
                tag_field,
                variants,
            } => {
                let tag = value
                    .get(&**tag_field)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RegistryError::MissingTag {
                        tag_field: tag_field.to_string(),
                    })?;
                variants
                    .iter()
                    .find(|entry| &*entry.tag == tag)
                    .map(|entry| &entry.variant)
                    .ok_or_else(|| RegistryError::UnknownTag {
                        tag_field: tag_field.to_string(),
                        tag: tag.to_string(),
                    })
            }
        }
    }
}

/// Default descriptor installed on a union field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDefault {
    /// No default; a value must be supplied
    Required,
    /// A default is configured but no matching variant exists yet
    Unresolved { tag: Option<Tag> },
    /// Instantiate `variant` from `template`
    Variant {
        variant: TypeName,
        tag: Tag,
        template: Arc<Template>,
    },
}

impl FieldDefault {
    /// Build a fresh default value for `owner.field`
    pub fn instantiate(&self, owner: &TypeName, field: &str) -> Result<Value, RegistryError> {
        match self {
            FieldDefault::Required => Err(RegistryError::MissingDiscriminatedValue {
                owner: owner.clone(),
                field: field.to_string(),
            }),
            FieldDefault::Unresolved { tag } => Err(RegistryError::UnresolvedDefault {
                owner: owner.clone(),
                field: field.to_string(),
                tag: tag.clone(),
            }),
            FieldDefault::Variant { template, .. } => Ok(Value::Object((**template).clone())),
        }
    }

    pub fn variant(&self) -> Option<&TypeName> {
        match self {
            FieldDefault::Variant { variant, .. } => Some(variant),
            FieldDefault::Required | FieldDefault::Unresolved { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagged() -> FieldShape {
        FieldShape::Tagged {
            tag_field: Arc::from("kind"),
            variants: vec![
                TaggedVariant {
                    tag: Arc::from("circle"),
                    variant: TypeName::new("Circle"),
                },
                TaggedVariant {
                    tag: Arc::from("round"),
                    variant: TypeName::new("Circle"),
                },
                TaggedVariant {
                    tag: Arc::from("square"),
                    variant: TypeName::new("Square"),
                },
            ],
        }
    }

    #[test]
    fn test_type_name_borrows_as_str() {
        let mut map = ahash::AHashMap::new();
        map.insert(TypeName::new("Shape"), 1);
        assert_eq!(map.get("Shape"), Some(&1));
        assert_eq!(TypeName::of::<u32>().as_str(), "u32");
    }

    #[test]
    fn test_child_decl_builder() {
        let decl = ChildDecl::new("Circle")
            .tag("circle")
            .tags(["round"])
            .default_value("radius", json!(1.0));
        assert_eq!(decl.name, TypeName::new("Circle"));
        assert_eq!(decl.tags.len(), 2);
        assert_eq!(decl.defaults.get("radius"), Some(&json!(1.0)));
    }

    #[test]
    fn test_dispatch_by_tag() {
        let shape = tagged();
        assert!(shape
            .dispatch(&json!({"kind": "round"}))
            .is_ok_and(|ty| ty.as_str() == "Circle"));
        assert!(matches!(
            shape.dispatch(&json!({"kind": "hexagon"})),
            Err(RegistryError::UnknownTag { .. })
        ));
        assert!(matches!(
            shape.dispatch(&json!({"radius": 2})),
            Err(RegistryError::MissingTag { .. })
        ));
        assert_eq!(shape.variant_types().len(), 2);
    }

    #[test]
    fn test_single_variant_dispatches_anything() {
        let shape = FieldShape::Single {
            variant: TypeName::new("Circle"),
        };
        assert!(!shape.is_discriminated());
        assert!(shape.tag_field().is_none());
        assert!(shape
            .dispatch(&json!({"radius": 2}))
            .is_ok_and(|ty| ty.as_str() == "Circle"));
    }

    #[test]
    fn test_default_policy_serde_forms() {
        let parsed: Result<DefaultPolicy, _> =
            serde_json::from_value(json!({"policy": "predetermined", "tag": "circle"}));
        assert!(parsed.is_ok_and(|p| p == DefaultPolicy::Predetermined(Arc::from("circle"))));

        let parsed: Result<DefaultPolicy, _> =
            serde_json::from_value(json!({"policy": "last_registered"}));
        assert!(parsed.is_ok_and(|p| p == DefaultPolicy::LastRegistered));
    }

    #[test]
    fn test_instantiate_returns_fresh_copies() {
        let owner = TypeName::new("Canvas");
        let mut template = Template::new();
        template.insert("kind".to_string(), json!("circle"));
        let default = FieldDefault::Variant {
            variant: TypeName::new("Circle"),
            tag: Arc::from("circle"),
            template: Arc::new(template),
        };

        let first = default.instantiate(&owner, "item");
        assert!(first.is_ok_and(|v| v == json!({"kind": "circle"})));
        assert!(matches!(
            FieldDefault::Required.instantiate(&owner, "item"),
            Err(RegistryError::MissingDiscriminatedValue { .. })
        ));
    }
}
