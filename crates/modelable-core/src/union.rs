//! Union extension engine
//!
//! A union feature keeps one field of an owner model typed as the union of a
//! base's variants. Every re-derivation rebuilds the shape from the graph,
//! resolves the default and pushes both to the schema host.

use crate::graph::SubtypeGraph;
use crate::host::SchemaHost;
use crate::policy::resolve_default;
use crate::types::{BaseType, FieldDefault, FieldShape, TaggedVariant, TypeName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A field kept in sync with the variants of a base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionFeature {
    pub owner: TypeName,
    pub field: Arc<str>,
    /// `(tag, variant)` entries in registration order
    variants: Vec<TaggedVariant>,
    /// Set once two entries exist; never cleared
    discriminated: bool,
    shape: FieldShape,
    default: FieldDefault,
    /// Number of times the shape was installed in the host
    revision: u64,
}

impl UnionFeature {
    pub fn new(owner: TypeName, field: impl AsRef<str>) -> Self {
        UnionFeature {
            owner,
            field: Arc::from(field.as_ref()),
            variants: Vec::new(),
            discriminated: false,
            shape: FieldShape::Unset,
            default: FieldDefault::Required,
            revision: 0,
        }
    }

    pub fn variants(&self) -> &[TaggedVariant] {
        &self.variants
    }

    pub fn is_discriminated(&self) -> bool {
        self.discriminated
    }

    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Rebuild the field from the current variants of `base`
    pub(crate) fn rederive(&mut self, base: &BaseType, graph: &SubtypeGraph, host: &dyn SchemaHost) {
        let key = base.discriminator_key.as_deref();
        self.variants = graph.entries(base.name.as_str());

        if graph.children_of(base.name.as_str()).count() >= 2 {
            self.discriminated = true;
        }

        self.shape = match (self.discriminated, key, self.variants.first()) {
            (_, _, None) => FieldShape::Unset,
            (true, Some(key), _) => FieldShape::Tagged {
                tag_field: Arc::from(key),
                variants: self.variants.clone(),
            },
            (_, _, Some(only)) => FieldShape::Single {
                variant: only.variant.clone(),
            },
        };
        self.default = resolve_default(&base.default_policy, key, &self.variants, graph);

        host.install_field(&self.owner, &self.field, self.shape.clone(), self.default.clone());
        host.rebuild(&self.owner);
        self.revision += 1;

        debug!(
            "Rederived '{}.{}' from base '{}': {} entries, discriminated={}, default={:?}",
            self.owner,
            self.field,
            base.name,
            self.variants.len(),
            self.discriminated,
            self.default.variant().map(TypeName::as_str)
        );
    }
}
