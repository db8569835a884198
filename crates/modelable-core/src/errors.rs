use crate::types::{Tag, TypeName};
use std::io;
use thiserror::Error;

/// Errors raised by registration, declaration and construction calls
///
/// Every error is reported by the call that caused it and leaves the registry
/// exactly as it was before that call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Type '{0}' is already registered as an extensible base")]
    DuplicateBase(TypeName),

    #[error("Variant '{child}' is already registered under '{base}'")]
    DuplicateChild { base: TypeName, child: TypeName },

    #[error("Tag '{tag}' of variant '{child}' collides with '{existing}' under base '{base}'")]
    TagCollision {
        base: TypeName,
        tag: Tag,
        child: TypeName,
        existing: TypeName,
    },

    #[error("Enum '{0}' does not support inserting members at runtime")]
    Capability(String),

    #[error("Field '{owner}.{field}' has no default variant and no value was provided")]
    MissingDiscriminatedValue { owner: TypeName, field: String },

    #[error("Default of field '{owner}.{field}' is unresolved: {}", describe_pending(.tag.as_deref()))]
    UnresolvedDefault {
        owner: TypeName,
        field: String,
        tag: Option<Tag>,
    },

    #[error("Cannot extend '{target}': {reason}")]
    InvalidDecoratedType { target: String, reason: String },

    #[error("Unknown extensible base '{0}'")]
    UnknownBase(TypeName),

    #[error("Variant '{child}' must declare a value for discriminator '{key}' of base '{base}'")]
    MissingDiscriminator {
        base: TypeName,
        child: TypeName,
        key: String,
    },

    #[error("Variant '{child}' declares tags but base '{base}' has no discriminator key")]
    UnexpectedDiscriminator { base: TypeName, child: TypeName },

    #[error("Unknown model '{0}'")]
    UnknownModel(TypeName),

    #[error("No variant is registered for tag '{tag}' of tag field '{tag_field}'")]
    UnknownTag { tag_field: String, tag: String },

    #[error("Value has no string tag field '{tag_field}'")]
    MissingTag { tag_field: String },
}

fn describe_pending(tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("no variant with tag '{}' is registered yet", tag),
        None => "no variant is registered yet".to_string(),
    }
}

/// Errors that can occur while exporting a registry snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to serialize snapshot as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unresolved_default_display() {
        let err = RegistryError::UnresolvedDefault {
            owner: TypeName::new("Canvas"),
            field: "item".to_string(),
            tag: Some(Arc::from("circle")),
        };
        assert_eq!(
            err.to_string(),
            "Default of field 'Canvas.item' is unresolved: no variant with tag 'circle' is registered yet"
        );

        let err = RegistryError::UnresolvedDefault {
            owner: TypeName::new("Canvas"),
            field: "item".to_string(),
            tag: None,
        };
        assert!(err.to_string().ends_with("no variant is registered yet"));
    }

    #[test]
    fn test_tag_collision_display() {
        let err = RegistryError::TagCollision {
            base: TypeName::new("Shape"),
            tag: Arc::from("circle"),
            child: TypeName::new("Disc"),
            existing: TypeName::new("Circle"),
        };
        assert_eq!(
            err.to_string(),
            "Tag 'circle' of variant 'Disc' collides with 'Circle' under base 'Shape'"
        );
    }
}
