//! Registry facade
//!
//! `Registry` is the only mutable entry point. It owns the subtype graph and
//! feature registry behind a single lock; every declaration validates in full
//! before it mutates anything, then propagates to the features of the
//! affected scope while still holding the lock.

use crate::enumeration::{EnumFeature, ExtensibleEnum};
use crate::errors::RegistryError;
use crate::features::FeatureRegistry;
use crate::graph::{ChildPlan, SubtypeGraph};
use crate::host::{ModelCatalog, SchemaHost};
use crate::policy::resolve_default;
use crate::snapshot::{BaseSnapshot, EnumSnapshot, RegistrySnapshot, UnionSnapshot};
use crate::types::{
    BaseType, ChildDecl, ChildType, DefaultPolicy, FieldDefault, FieldShape, Tag, TaggedVariant,
    TypeName,
};
use crate::union::UnionFeature;
use modelable_config::{DuplicateChildren, RegistrySettings};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

static GLOBAL_CATALOG: Lazy<Arc<ModelCatalog>> = Lazy::new(|| Arc::new(ModelCatalog::new()));

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::new(GLOBAL_CATALOG.clone()));

#[derive(Debug, Default)]
struct RegistryState {
    graph: SubtypeGraph,
    features: FeatureRegistry,
}

pub struct Registry {
    state: RwLock<RegistryState>,
    host: Arc<dyn SchemaHost>,
    duplicates: DuplicateChildren,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.state)
            .field("duplicates", &self.duplicates)
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn new(host: Arc<dyn SchemaHost>) -> Self {
        Self::with_settings(host, &RegistrySettings::default())
    }

    pub fn with_settings(host: Arc<dyn SchemaHost>, settings: &RegistrySettings) -> Self {
        Registry {
            state: RwLock::new(RegistryState::default()),
            host,
            duplicates: settings.duplicate_children,
        }
    }

    /// Process-wide registry backed by [`Registry::global_catalog`]
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    pub fn global_catalog() -> &'static Arc<ModelCatalog> {
        &GLOBAL_CATALOG
    }

    pub fn host(&self) -> &Arc<dyn SchemaHost> {
        &self.host
    }

    // =========================================================================
    // DECLARATIONS
    // =========================================================================

    /// Declare `name` extensible
    ///
    /// Calling this on an already registered variant opens a nested scope:
    /// variants declared under it from now on join it instead of the outer base.
    pub fn register_base(
        &self,
        name: impl Into<TypeName>,
        discriminator_key: Option<&str>,
        default_policy: DefaultPolicy,
    ) -> Result<BaseType, RegistryError> {
        let name = name.into();
        if discriminator_key.is_some_and(|key| key.trim().is_empty()) {
            return Err(RegistryError::InvalidDecoratedType {
                target: name.to_string(),
                reason: "discriminator key cannot be empty".to_string(),
            });
        }
        if discriminator_key.is_none() && default_policy != DefaultPolicy::None {
            return Err(RegistryError::InvalidDecoratedType {
                target: name.to_string(),
                reason: "a default policy requires a discriminator key".to_string(),
            });
        }

        let mut state = self.state.write();
        let base = state
            .graph
            .add_base(name, discriminator_key.map(Arc::from), default_policy)?
            .clone();

        info!(
            "Registered base '{}' (discriminator: {}, default: {:?})",
            base.name,
            base.discriminator_key.as_deref().unwrap_or("-"),
            base.default_policy
        );
        Ok(base)
    }

    /// Register a variant under `parent` and propagate it to every feature
    ///
    /// Returns the scope the variant joined.
    pub fn register_child(
        &self,
        parent: impl Into<TypeName>,
        decl: ChildDecl,
    ) -> Result<TypeName, RegistryError> {
        let parent = parent.into();
        let mut state = self.state.write();

        let scope = state.graph.resolve_scope(parent.as_str())?;
        let child_name = decl.name.clone();
        match state.graph.plan_child(&scope, &parent, decl, self.duplicates)? {
            ChildPlan::Unchanged(existing) => {
                warn!(
                    "Variant '{}' is already registered under '{}', ignoring",
                    child_name, existing
                );
                return Ok(existing);
            }
            ChildPlan::Insert(child) => {
                info!(
                    "Registered variant '{}' under '{}' with tags {:?}",
                    child.name,
                    scope,
                    child.tags.iter().map(|t| &**t).collect::<Vec<_>>()
                );
                state.graph.insert_child(child);
            }
        }

        Self::propagate(&mut state, self.host.as_ref(), &scope);
        Ok(scope)
    }

    /// Keep `owner.field` typed as the union of `base`'s variants
    ///
    /// Returns the shape installed right away.
    pub fn declare_union_feature(
        &self,
        base: &str,
        field: &str,
        owner: impl Into<TypeName>,
    ) -> Result<FieldShape, RegistryError> {
        let owner = owner.into();
        let mut state = self.state.write();
        let RegistryState { graph, features } = &mut *state;

        let base_type = keyed_base(graph, base)?;
        if !self.host.accepts_model(&owner) {
            return Err(RegistryError::InvalidDecoratedType {
                target: owner.to_string(),
                reason: "not a model known to the schema host".to_string(),
            });
        }

        if let Some(bound) = features.binding(&owner, field) {
            if bound.as_str() == base {
                debug!("Union feature '{}.{}' already declared on '{}'", owner, field, base);
                return Ok(features
                    .union_feature(&owner, field)
                    .map(|u| u.shape().clone())
                    .unwrap_or_default());
            }
            return Err(RegistryError::InvalidDecoratedType {
                target: format!("{}.{}", owner, field),
                reason: format!("field is already bound to base '{}'", bound),
            });
        }

        let feature = features.bind_union(base_type.name.clone(), UnionFeature::new(owner, field));
        feature.rederive(base_type, graph, self.host.as_ref());

        info!(
            "Declared union feature '{}.{}' on base '{}'",
            feature.owner, feature.field, base_type.name
        );
        Ok(feature.shape().clone())
    }

    /// Keep `target` populated with the tags of `base`'s variants
    ///
    /// Returns the values known to the feature after declaration.
    pub fn declare_enum_feature(
        &self,
        base: &str,
        target: &Arc<dyn ExtensibleEnum>,
    ) -> Result<Vec<Tag>, RegistryError> {
        if !target.supports_insertion() {
            return Err(RegistryError::Capability(target.name().to_string()));
        }

        let mut state = self.state.write();
        let RegistryState { graph, features } = &mut *state;
        let base_type = keyed_base(graph, base)?;

        if features.has_enum(base, target) {
            debug!("Enum '{}' already declared on '{}'", target.name(), base);
            return Ok(graph.tags_of(base));
        }

        let mut feature = EnumFeature::new(target);
        let inserted = feature.extend(&graph.tags_of(base));
        let values = feature.values().to_vec();
        features.add_enum(base_type.name.clone(), feature);

        info!(
            "Declared enum feature '{}' on base '{}' ({} initial members)",
            target.name(),
            base,
            inserted
        );
        Ok(values)
    }

    fn propagate(state: &mut RegistryState, host: &dyn SchemaHost, scope: &TypeName) {
        let RegistryState { graph, features } = state;
        let (Some(base), Some(attached)) = (graph.base(scope.as_str()), features.of_mut(scope.as_str()))
        else {
            return;
        };

        for union_feature in &mut attached.unions {
            union_feature.rederive(base, graph, host);
        }

        let tags = graph.tags_of(scope.as_str());
        for feature in &mut attached.enums {
            let inserted = feature.extend(&tags);
            if inserted > 0 {
                debug!("Enum '{}' gained {} member(s)", feature.name(), inserted);
            }
        }
    }

    // =========================================================================
    // READERS
    // =========================================================================

    pub fn base(&self, name: &str) -> Option<BaseType> {
        self.state.read().graph.base(name).cloned()
    }

    pub fn child(&self, name: &str) -> Option<ChildType> {
        self.state.read().graph.child(name).cloned()
    }

    /// Variants of `base` in registration order
    pub fn children(&self, base: &str) -> Vec<ChildType> {
        self.state.read().graph.children_of(base).cloned().collect()
    }

    /// `(tag, variant)` entries of `base` in registration order
    pub fn variants(&self, base: &str) -> Vec<TaggedVariant> {
        self.state.read().graph.entries(base)
    }

    pub fn union_feature(&self, owner: &str, field: &str) -> Option<UnionFeature> {
        self.state
            .read()
            .features
            .union_feature(&TypeName::new(owner), field)
            .cloned()
    }

    pub fn union_shape(&self, owner: &str, field: &str) -> Option<FieldShape> {
        self.union_feature(owner, field).map(|u| u.shape().clone())
    }

    pub fn enum_features(&self, base: &str) -> Vec<EnumFeature> {
        self.state
            .read()
            .features
            .of(base)
            .map(|f| f.enums.clone())
            .unwrap_or_default()
    }

    /// Values of the enum feature named `name` on `base`
    pub fn enum_values(&self, base: &str, name: &str) -> Option<Vec<Tag>> {
        self.state.read().features.of(base).and_then(|f| {
            f.enums
                .iter()
                .find(|e| e.name() == name)
                .map(|e| e.values().to_vec())
        })
    }

    /// Default of `owner.field`, resolved from the current variants
    pub fn default_for(&self, owner: &str, field: &str) -> Option<FieldDefault> {
        let state = self.state.read();
        let base = state.features.binding(&TypeName::new(owner), field)?;
        let base = state.graph.base(base.as_str())?;
        let variants = state.graph.entries(base.name.as_str());
        Some(resolve_default(
            &base.default_policy,
            base.discriminator_key.as_deref(),
            &variants,
            &state.graph,
        ))
    }

    /// Fresh default value for `owner.field`
    pub fn construct_field(&self, owner: &str, field: &str) -> Result<Value, RegistryError> {
        let owner = TypeName::new(owner);
        let default = self
            .default_for(owner.as_str(), field)
            .ok_or_else(|| RegistryError::InvalidDecoratedType {
                target: format!("{}.{}", owner, field),
                reason: "no union feature is declared for this field".to_string(),
            })?;
        default.instantiate(&owner, field)
    }

    /// Variant type an explicit value of `owner.field` dispatches to
    pub fn dispatch(&self, owner: &str, field: &str, value: &Value) -> Result<TypeName, RegistryError> {
        let shape = self
            .union_shape(owner, field)
            .ok_or_else(|| RegistryError::InvalidDecoratedType {
                target: format!("{}.{}", owner, field),
                reason: "no union feature is declared for this field".to_string(),
            })?;
        shape.dispatch(value).cloned()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        let bases = state
            .graph
            .bases()
            .map(|base| {
                let attached = state.features.of(base.name.as_str());
                BaseSnapshot {
                    name: base.name.clone(),
                    discriminator_key: base.discriminator_key.clone(),
                    default_policy: base.default_policy.clone(),
                    variants: state.graph.children_of(base.name.as_str()).cloned().collect(),
                    unions: attached
                        .map(|f| {
                            f.unions
                                .iter()
                                .map(|u| UnionSnapshot {
                                    owner: u.owner.clone(),
                                    field: u.field.clone(),
                                    discriminated: u.is_discriminated(),
                                    shape: u.shape().clone(),
                                    default: u.default().clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                    enums: attached
                        .map(|f| {
                            f.enums
                                .iter()
                                .map(|e| EnumSnapshot {
                                    name: Arc::from(e.name()),
                                    alive: e.is_alive(),
                                    values: e.values().to_vec(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();
        RegistrySnapshot::new(bases)
    }
}

/// A registered base that carries a discriminator key
fn keyed_base<'a>(graph: &'a SubtypeGraph, base: &str) -> Result<&'a BaseType, RegistryError> {
    let base_type = graph
        .base(base)
        .ok_or_else(|| RegistryError::InvalidDecoratedType {
            target: base.to_string(),
            reason: "not a registered extensible base".to_string(),
        })?;
    if base_type.discriminator_key.is_none() {
        return Err(RegistryError::InvalidDecoratedType {
            target: base.to_string(),
            reason: "base has no discriminator key".to_string(),
        });
    }
    Ok(base_type)
}
