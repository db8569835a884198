//! Modelable Core
//!
//! Runtime extension registry for tagged unions and extensible enumerations.
//! Plugins register variants of an extensible base; every union field and
//! enumeration declared against that base is kept in sync with the base's
//! variants as they arrive.
//!
//! The registry does not own model definitions. Field shapes and defaults are
//! handed to a [`SchemaHost`]; [`ModelCatalog`] is the in-memory host.

pub mod enumeration;
pub mod errors;
pub mod features;
pub mod graph;
pub mod host;
pub mod policy;
pub mod registry;
pub mod snapshot;
pub mod types;
pub mod union;

pub use enumeration::{DynamicEnum, EnumFeature, EnumMember, ExtensibleEnum, SealedEnum};
pub use errors::{RegistryError, SnapshotError};
pub use host::{FieldSpec, ModelCatalog, ModelSchema, SchemaHost};
pub use registry::Registry;
pub use snapshot::{BaseSnapshot, EnumSnapshot, RegistrySnapshot, UnionSnapshot};
pub use types::{
    BaseType, ChildDecl, ChildType, DefaultPolicy, FieldDefault, FieldShape, Tag, TaggedVariant,
    Template, TypeName,
};
pub use union::UnionFeature;
