//! Subtype graph
//!
//! Records every extensible base, the variants registered into each base's
//! scope (in registration order) and a per-scope tag index used to detect
//! collisions. Variants are never removed.

use crate::errors::RegistryError;
use crate::types::{BaseType, ChildDecl, ChildType, DefaultPolicy, Tag, TaggedVariant, TypeName};
use ahash::{AHashMap, AHashSet};
use modelable_config::DuplicateChildren;
use std::sync::Arc;

/// Outcome of validating a variant declaration
#[derive(Debug, Clone, PartialEq)]
pub enum ChildPlan {
    /// The variant is new and may be inserted
    Insert(ChildType),
    /// An identical registration already exists and duplicates are ignored
    Unchanged(TypeName),
}

#[derive(Debug, Clone, Default)]
pub struct SubtypeGraph {
    bases: AHashMap<TypeName, BaseType>,
    /// Bases in registration order
    base_order: Vec<TypeName>,
    children: AHashMap<TypeName, ChildType>,
    /// scope -> tag -> variant
    tag_index: AHashMap<TypeName, AHashMap<Tag, TypeName>>,
}

impl SubtypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_base(
        &mut self,
        name: TypeName,
        discriminator_key: Option<Arc<str>>,
        default_policy: DefaultPolicy,
    ) -> Result<&BaseType, RegistryError> {
        if self.bases.contains_key(&name) {
            return Err(RegistryError::DuplicateBase(name));
        }

        self.base_order.push(name.clone());
        self.tag_index.insert(name.clone(), AHashMap::new());
        let base = self.bases.entry(name.clone()).or_insert(BaseType {
            name,
            discriminator_key,
            default_policy,
            children: Vec::new(),
        });
        Ok(base)
    }

    #[inline]
    pub fn base(&self, name: &str) -> Option<&BaseType> {
        self.bases.get(name)
    }

    #[inline]
    pub fn child(&self, name: &str) -> Option<&ChildType> {
        self.children.get(name)
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.bases.contains_key(name)
    }

    /// Bases in registration order
    pub fn bases(&self) -> impl Iterator<Item = &BaseType> {
        self.base_order
            .iter()
            .filter_map(move |name| self.bases.get(name))
    }

    /// Variants of a scope in registration order
    pub fn children_of<'a>(&'a self, base: &str) -> impl Iterator<Item = &'a ChildType> + 'a {
        self.bases
            .get(base)
            .into_iter()
            .flat_map(|b| b.children.iter())
            .filter_map(move |name| self.children.get(name))
    }

    /// Scope a variant declared under `parent` joins
    ///
    /// A base is its own scope, including a variant that also opened a nested
    /// scope. Any other registered variant forwards to the scope it joined.
    pub fn resolve_scope(&self, parent: &str) -> Result<TypeName, RegistryError> {
        if let Some(base) = self.bases.get(parent) {
            return Ok(base.name.clone());
        }
        if let Some(child) = self.children.get(parent) {
            return Ok(child.base.clone());
        }
        Err(RegistryError::UnknownBase(TypeName::new(parent)))
    }

    /// Validate a declaration without touching the graph
    pub fn plan_child(
        &self,
        scope: &TypeName,
        parent: &TypeName,
        decl: ChildDecl,
        duplicates: DuplicateChildren,
    ) -> Result<ChildPlan, RegistryError> {
        let base = self
            .bases
            .get(scope)
            .ok_or_else(|| RegistryError::UnknownBase(scope.clone()))?;

        if decl.name == *scope {
            return Err(RegistryError::InvalidDecoratedType {
                target: decl.name.to_string(),
                reason: "a base cannot be registered as its own variant".to_string(),
            });
        }

        if let Some(existing) = self.children.get(&decl.name) {
            let identical = existing.base == *scope && existing.tags == decl.tags;
            if identical && duplicates == DuplicateChildren::Ignore {
                return Ok(ChildPlan::Unchanged(existing.base.clone()));
            }
            return Err(RegistryError::DuplicateChild {
                base: existing.base.clone(),
                child: decl.name,
            });
        }

        match (&base.discriminator_key, decl.tags.is_empty()) {
            (Some(key), true) => {
                return Err(RegistryError::MissingDiscriminator {
                    base: scope.clone(),
                    child: decl.name,
                    key: key.to_string(),
                });
            }
            (None, false) => {
                return Err(RegistryError::UnexpectedDiscriminator {
                    base: scope.clone(),
                    child: decl.name,
                });
            }
            _ => {}
        }

        let index = self.tag_index.get(scope);
        let mut seen: AHashSet<&Tag> = AHashSet::with_capacity(decl.tags.len());
        for tag in &decl.tags {
            if let Some(existing) = index.and_then(|idx| idx.get(tag)) {
                return Err(RegistryError::TagCollision {
                    base: scope.clone(),
                    tag: tag.clone(),
                    child: decl.name.clone(),
                    existing: existing.clone(),
                });
            }
            if !seen.insert(tag) {
                return Err(RegistryError::TagCollision {
                    base: scope.clone(),
                    tag: tag.clone(),
                    child: decl.name.clone(),
                    existing: decl.name.clone(),
                });
            }
        }

        Ok(ChildPlan::Insert(ChildType {
            name: decl.name,
            base: scope.clone(),
            parent: parent.clone(),
            tags: decl.tags,
            defaults: Arc::new(decl.defaults),
        }))
    }

    /// Append a validated variant to its scope
    pub fn insert_child(&mut self, child: ChildType) {
        let index = self.tag_index.entry(child.base.clone()).or_default();
        for tag in &child.tags {
            index.insert(tag.clone(), child.name.clone());
        }
        if let Some(base) = self.bases.get_mut(&child.base) {
            base.children.push(child.name.clone());
        }
        self.children.insert(child.name.clone(), child);
    }

    /// Tagged entries of a scope: one per tag, variants in registration order
    pub fn entries(&self, base: &str) -> Vec<TaggedVariant> {
        self.children_of(base)
            .flat_map(|child| {
                child.tags.iter().map(move |tag| TaggedVariant {
                    tag: tag.clone(),
                    variant: child.name.clone(),
                })
            })
            .collect()
    }

    /// Distinct tags of a scope in first-seen order
    pub fn tags_of(&self, base: &str) -> Vec<Tag> {
        self.children_of(base)
            .flat_map(|child| child.tags.iter().cloned())
            .collect()
    }
}
