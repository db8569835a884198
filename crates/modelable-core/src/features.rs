//! Feature registry
//!
//! Per-base list of union and enum features, plus the index of which base
//! each `(owner, field)` pair is bound to.

use crate::enumeration::{EnumFeature, ExtensibleEnum};
use crate::types::TypeName;
use crate::union::UnionFeature;
use ahash::AHashMap;
use std::sync::Arc;

/// Features attached to one base
#[derive(Debug, Clone, Default)]
pub struct BaseFeatures {
    pub unions: Vec<UnionFeature>,
    pub enums: Vec<EnumFeature>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    by_base: AHashMap<TypeName, BaseFeatures>,
    /// (owner, field) -> base
    bindings: AHashMap<(TypeName, Arc<str>), TypeName>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(&self, base: &str) -> Option<&BaseFeatures> {
        self.by_base.get(base)
    }

    pub(crate) fn of_mut(&mut self, base: &str) -> Option<&mut BaseFeatures> {
        self.by_base.get_mut(base)
    }

    /// Base the field `owner.field` is bound to
    pub fn binding(&self, owner: &TypeName, field: &str) -> Option<&TypeName> {
        self.bindings.get(&(owner.clone(), Arc::from(field)))
    }

    pub fn union_feature(&self, owner: &TypeName, field: &str) -> Option<&UnionFeature> {
        let base = self.binding(owner, field)?;
        self.by_base
            .get(base)?
            .unions
            .iter()
            .find(|u| u.owner == *owner && &*u.field == field)
    }

    pub fn has_enum(&self, base: &str, target: &Arc<dyn ExtensibleEnum>) -> bool {
        self.by_base
            .get(base)
            .is_some_and(|f| f.enums.iter().any(|e| e.targets(target)))
    }

    /// Attach a union feature; the caller has checked the binding is free
    pub(crate) fn bind_union(&mut self, base: TypeName, feature: UnionFeature) -> &mut UnionFeature {
        self.bindings.insert(
            (feature.owner.clone(), feature.field.clone()),
            base.clone(),
        );
        let unions = &mut self.by_base.entry(base).or_default().unions;
        unions.push(feature);
        let last = unions.len() - 1;
        &mut unions[last]
    }

    pub(crate) fn add_enum(&mut self, base: TypeName, feature: EnumFeature) {
        self.by_base.entry(base).or_default().enums.push(feature);
    }
}
