//! Default policy resolver
//!
//! Maps a base's `DefaultPolicy` and the current variant set of a union field
//! to the `FieldDefault` the host installs. Re-run on every registration in
//! the scope, so `LastRegistered` moves forward and `Predetermined` resolves
//! as soon as its variant arrives.

use crate::graph::SubtypeGraph;
use crate::types::{DefaultPolicy, FieldDefault, Tag, TaggedVariant, Template, TypeName};
use serde_json::Value;
use std::sync::Arc;

/// Resolve the default for a variant set
///
/// `variants` is in registration order. `key` is the base's discriminator key;
/// the chosen tag is written into the default template under it.
pub fn resolve_default(
    policy: &DefaultPolicy,
    key: Option<&str>,
    variants: &[TaggedVariant],
    graph: &SubtypeGraph,
) -> FieldDefault {
    match policy {
        DefaultPolicy::None => FieldDefault::Required,
        DefaultPolicy::FirstRegistered => match variants.first() {
            Some(first) => variant_default(graph, key, &first.variant, None),
            None => FieldDefault::Unresolved { tag: None },
        },
        DefaultPolicy::LastRegistered => match variants.last() {
            Some(last) => variant_default(graph, key, &last.variant, None),
            None => FieldDefault::Unresolved { tag: None },
        },
        DefaultPolicy::Predetermined(tag) => {
            match variants.iter().find(|entry| entry.tag == *tag) {
                Some(entry) => variant_default(graph, key, &entry.variant, Some(tag)),
                None => FieldDefault::Unresolved {
                    tag: Some(tag.clone()),
                },
            }
        }
    }
}

/// Default instance of one variant, tagged with `tag` or its primary tag
fn variant_default(
    graph: &SubtypeGraph,
    key: Option<&str>,
    variant: &TypeName,
    tag: Option<&Tag>,
) -> FieldDefault {
    let child = graph.child(variant.as_str());
    let tag = tag
        .or_else(|| child.and_then(|c| c.primary_tag()))
        .cloned()
        .unwrap_or_else(|| Arc::from(""));

    let mut template: Template = child.map(|c| (*c.defaults).clone()).unwrap_or_default();
    if let Some(key) = key {
        template.insert(key.to_string(), Value::String(tag.to_string()));
    }

    FieldDefault::Variant {
        variant: variant.clone(),
        tag,
        template: Arc::new(template),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChildPlan;
    use crate::types::ChildDecl;
    use modelable_config::DuplicateChildren;
    use serde_json::json;

    fn graph(children: &[(&str, &[&str])]) -> SubtypeGraph {
        let mut graph = SubtypeGraph::new();
        let shape = TypeName::new("Shape");
        assert!(graph
            .add_base(shape.clone(), Some(Arc::from("kind")), DefaultPolicy::None)
            .is_ok());
        for (name, tags) in children {
            let decl = ChildDecl::new(*name)
                .tags(tags.iter())
                .default_value("size", json!(1));
            if let Ok(ChildPlan::Insert(child)) =
                graph.plan_child(&shape, &shape, decl, DuplicateChildren::Error)
            {
                graph.insert_child(child);
            }
        }
        graph
    }

    fn resolve(policy: &DefaultPolicy, graph: &SubtypeGraph) -> FieldDefault {
        resolve_default(policy, Some("kind"), &graph.entries("Shape"), graph)
    }

    #[test]
    fn test_none_is_always_required() {
        let graph = graph(&[("Circle", &["circle"]), ("Square", &["square"])]);
        assert_eq!(resolve(&DefaultPolicy::None, &graph), FieldDefault::Required);
    }

    #[test]
    fn test_first_and_last_on_empty_set() {
        let graph = graph(&[]);
        assert_eq!(
            resolve(&DefaultPolicy::FirstRegistered, &graph),
            FieldDefault::Unresolved { tag: None }
        );
        assert_eq!(
            resolve(&DefaultPolicy::LastRegistered, &graph),
            FieldDefault::Unresolved { tag: None }
        );
    }

    #[test]
    fn test_last_registered_uses_primary_tag() {
        let graph = graph(&[("Circle", &["circle"]), ("Square", &["square", "box"])]);
        let default = resolve(&DefaultPolicy::LastRegistered, &graph);
        let FieldDefault::Variant { variant, tag, template } = default else {
            panic!("expected a resolved default");
        };
        assert_eq!(variant.as_str(), "Square");
        assert_eq!(&*tag, "square");
        assert_eq!(Value::Object((*template).clone()), json!({"size": 1, "kind": "square"}));
    }

    #[test]
    fn test_predetermined_uses_requested_alias() {
        let policy = DefaultPolicy::Predetermined(Arc::from("box"));
        assert_eq!(
            resolve(&policy, &graph(&[("Circle", &["circle"])])),
            FieldDefault::Unresolved {
                tag: Some(Arc::from("box"))
            }
        );

        let graph = graph(&[("Circle", &["circle"]), ("Square", &["square", "box"])]);
        let default = resolve(&policy, &graph);
        assert!(matches!(
            default,
            FieldDefault::Variant { ref variant, ref tag, .. }
                if variant.as_str() == "Square" && &**tag == "box"
        ));
    }
}
