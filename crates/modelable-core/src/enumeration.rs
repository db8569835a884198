//! Enum extension engine
//!
//! An enum feature keeps a registered enumeration in sync with the tags of a
//! base's variants. The enumeration itself is external and only needs the
//! capability of inserting a member at runtime.

use crate::types::Tag;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A named enumeration member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: Arc<str>,
    pub value: Arc<str>,
}

/// Capability required from an enumeration used as an enum feature
pub trait ExtensibleEnum: Send + Sync {
    fn name(&self) -> &str;

    /// Whether members can be inserted after construction
    fn supports_insertion(&self) -> bool;

    /// Insert a member, returning `false` when the value is already present
    /// or the enumeration cannot grow
    fn insert_member(&self, name: &str, value: &str) -> bool;

    fn members(&self) -> Vec<EnumMember>;

    fn contains(&self, value: &str) -> bool {
        self.members().iter().any(|m| &*m.value == value)
    }
}

/// Enumeration that grows at runtime
#[derive(Debug)]
pub struct DynamicEnum {
    name: Arc<str>,
    members: RwLock<Vec<EnumMember>>,
}

impl DynamicEnum {
    pub fn new(name: impl AsRef<str>) -> Self {
        DynamicEnum {
            name: Arc::from(name.as_ref()),
            members: RwLock::new(Vec::new()),
        }
    }

    /// Start with members whose name equals their value
    pub fn with_values<I, S>(name: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let this = Self::new(name);
        for value in values {
            this.insert_member(value.as_ref(), value.as_ref());
        }
        this
    }

    pub fn values(&self) -> Vec<Arc<str>> {
        self.members.read().iter().map(|m| m.value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

impl ExtensibleEnum for DynamicEnum {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_insertion(&self) -> bool {
        true
    }

    fn insert_member(&self, name: &str, value: &str) -> bool {
        let mut members = self.members.write();
        if members.iter().any(|m| &*m.value == value) {
            return false;
        }
        members.push(EnumMember {
            name: Arc::from(name),
            value: Arc::from(value),
        });
        true
    }

    fn members(&self) -> Vec<EnumMember> {
        self.members.read().clone()
    }
}

/// Enumeration whose members are fixed at construction
#[derive(Debug, Clone)]
pub struct SealedEnum {
    name: Arc<str>,
    members: Vec<EnumMember>,
}

impl SealedEnum {
    pub fn new<I, S>(name: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SealedEnum {
            name: Arc::from(name.as_ref()),
            members: values
                .into_iter()
                .map(|v| EnumMember {
                    name: Arc::from(v.as_ref()),
                    value: Arc::from(v.as_ref()),
                })
                .collect(),
        }
    }
}

impl ExtensibleEnum for SealedEnum {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_insertion(&self) -> bool {
        false
    }

    fn insert_member(&self, _name: &str, _value: &str) -> bool {
        false
    }

    fn members(&self) -> Vec<EnumMember> {
        self.members.clone()
    }
}

/// An enumeration registered against a base
///
/// Holds only a weak reference; the enumeration is owned elsewhere.
#[derive(Debug, Clone)]
pub struct EnumFeature {
    name: Arc<str>,
    target: Weak<dyn ExtensibleEnum>,
    /// Every tag inserted so far, in insertion order
    values: Vec<Tag>,
}

impl EnumFeature {
    pub fn new(target: &Arc<dyn ExtensibleEnum>) -> Self {
        EnumFeature {
            name: Arc::from(target.name()),
            target: Arc::downgrade(target),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Tag] {
        &self.values
    }

    /// Whether this feature decorates `target`
    pub fn targets(&self, target: &Arc<dyn ExtensibleEnum>) -> bool {
        std::ptr::eq(
            self.target.as_ptr().cast::<()>(),
            Arc::as_ptr(target).cast::<()>(),
        )
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Insert every tag not seen yet; returns how many were new
    pub(crate) fn extend(&mut self, tags: &[Tag]) -> usize {
        let target = self.target.upgrade();
        if target.is_none() {
            debug!("Enum '{}' was dropped, only tracking its values", self.name);
        }

        let mut inserted = 0;
        for tag in tags {
            if self.values.contains(tag) {
                continue;
            }
            self.values.push(tag.clone());
            inserted += 1;
            if let Some(ref target) = target {
                if target.insert_member(tag, tag) {
                    debug!("Added member '{}' to enum '{}'", tag, self.name);
                }
            }
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<Tag> {
        values.iter().map(|v| Arc::from(*v)).collect()
    }

    #[test]
    fn test_dynamic_enum_insert_is_idempotent() {
        let kinds = DynamicEnum::new("ShapeKind");
        assert!(kinds.insert_member("circle", "circle"));
        assert!(!kinds.insert_member("circle", "circle"));
        assert_eq!(kinds.len(), 1);
        assert!(kinds.contains("circle"));
    }

    #[test]
    fn test_sealed_enum_cannot_grow() {
        let colours = SealedEnum::new("Colour", ["red", "green"]);
        assert!(!colours.supports_insertion());
        assert!(!colours.insert_member("blue", "blue"));
        assert_eq!(colours.members().len(), 2);
    }

    #[test]
    fn test_feature_extends_target_once() {
        let kinds = Arc::new(DynamicEnum::new("ShapeKind"));
        let target: Arc<dyn ExtensibleEnum> = kinds.clone();
        let mut feature = EnumFeature::new(&target);
        assert!(feature.targets(&target));

        assert_eq!(feature.extend(&tags(&["circle", "square"])), 2);
        assert_eq!(feature.extend(&tags(&["circle", "square", "hex"])), 1);
        assert_eq!(kinds.values(), tags(&["circle", "square", "hex"]));
        assert_eq!(feature.values().len(), 3);
    }

    #[test]
    fn test_feature_survives_dropped_target() {
        let target: Arc<dyn ExtensibleEnum> = Arc::new(DynamicEnum::new("ShapeKind"));
        let mut feature = EnumFeature::new(&target);
        drop(target);

        assert!(!feature.is_alive());
        assert_eq!(feature.extend(&tags(&["circle"])), 1);
        assert_eq!(feature.values().len(), 1);
    }
}
