// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema analysis: reference resolution and validation.
//!
//! Takes the parser output and produces the resolved
//! [`Specification`]: node references are looked up, inheritance
//! back-edges are filled in, defaults are applied, and the invariants
//! the emitters rely on are checked — unique node names, unique field
//! names (including against inherited ones), valid `reorder` lists,
//! and a declared initialize function.
//!
//! A wrapped type reference resolves to a node when it is a plain
//! snake_case name matching a declared node and is not forced external
//! with `ext`; everything else — qualified paths, `ext` references, and
//! all bare (unwrapped) types — is an opaque primitive handed through
//! to the emitters. Nodes come out in declaration order, which the
//! block nesting already makes topological: parents precede their
//! derived nodes.

use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;
use crate::parser::ParsedSchema;
use crate::spec::{title_case, Field, FieldTarget, NodeType, Specification};

/// Default support library path.
const DEFAULT_SUPPORT_PATH: &str = "arbor_tree";

/// Default module name when the schema has no `namespace` directive.
const DEFAULT_MODULE_NAME: &str = "tree";

/// Resolves and validates a parsed schema.
///
/// # Errors
///
/// Fails with [`SchemaError`] on duplicate node or field names,
/// undefined node references, bare node references, unknown `reorder`
/// names, or a missing initialize function.
pub fn analyze(parsed: ParsedSchema) -> Result<Specification, SchemaError> {
    let initialize_fn = parsed
        .initialize_fn
        .ok_or(SchemaError::MissingInitializeFunction)?;

    let mut names: HashMap<String, usize> = HashMap::new();
    for (index, node) in parsed.nodes.iter().enumerate() {
        if names.insert(node.snake_name.clone(), index).is_some() {
            return Err(SchemaError::DuplicateNode {
                name: node.snake_name.clone(),
            });
        }
    }

    let mut nodes = Vec::with_capacity(parsed.nodes.len());
    for node in &parsed.nodes {
        let mut fields = Vec::with_capacity(node.fields.len());
        for field in &node.fields {
            let is_plain_name = !field.type_path.contains("::");
            let declared = names.get(field.type_path.as_str()).copied();
            let target = match (field.kind, declared) {
                (Some(_), Some(target_index)) if !field.is_ext && is_plain_name => {
                    FieldTarget::Node(target_index)
                }
                (None, Some(_)) if !field.is_ext && is_plain_name => {
                    return Err(SchemaError::BareNodeReference {
                        node: node.snake_name.clone(),
                        field: field.name.clone(),
                    });
                }
                (Some(_), None) if !field.is_ext && is_plain_name => {
                    // A wrapped plain name that matches no node is a
                    // typo, not a primitive.
                    return Err(SchemaError::UndefinedNode {
                        name: field.type_path.clone(),
                    });
                }
                _ => FieldTarget::Primitive(field.type_path.clone()),
            };
            fields.push(Field {
                name: field.name.clone(),
                doc: field.doc.clone(),
                kind: field.kind,
                target,
            });
        }
        nodes.push(NodeType {
            snake_name: node.snake_name.clone(),
            title_name: title_case(&node.snake_name),
            doc: node.doc.clone(),
            parent: node.parent,
            derived: Vec::new(),
            fields,
            order: node.order.clone(),
            is_error_marker: node.is_error_marker,
        });
    }

    // Inheritance back-edges, in declaration order.
    for index in 0..nodes.len() {
        if let Some(parent) = nodes[index].parent {
            nodes[parent].derived.push(index);
        }
    }

    let spec = Specification {
        module_name: if parsed.module_name.is_empty() {
            DEFAULT_MODULE_NAME.to_owned()
        } else {
            parsed.module_name
        },
        module_doc: parsed.module_doc,
        source_doc: parsed.source_doc,
        python_doc: parsed.python_doc,
        support_path: parsed
            .support_path
            .unwrap_or_else(|| DEFAULT_SUPPORT_PATH.to_owned()),
        initialize_fn,
        serialize_fn: parsed.serialize_fn,
        deserialize_fn: parsed.deserialize_fn,
        source_location: parsed.source_location,
        includes: parsed.includes,
        python_includes: parsed.python_includes,
        nodes,
        schema_hash: String::new(),
    };

    // Field names must be unique per node, inherited ones included.
    for index in 0..spec.nodes.len() {
        let mut seen = HashSet::new();
        for owned in spec.all_fields(index) {
            if !seen.insert(owned.field.name.clone()) {
                return Err(SchemaError::DuplicateField {
                    node: spec.nodes[index].snake_name.clone(),
                    field: owned.field.name,
                });
            }
        }

        let node = &spec.nodes[index];
        for name in &node.order {
            if !spec
                .all_fields(index)
                .iter()
                .any(|owned| &owned.field.name == name)
            {
                return Err(SchemaError::UnknownOrderField {
                    node: node.snake_name.clone(),
                    field: name.clone(),
                });
            }
        }
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::spec::EdgeKind;

    fn analyzed(source: &str) -> Result<Specification, SchemaError> {
        analyze(parse(source, "test.tree")?)
    }

    #[test]
    fn resolves_node_references_and_primitives() {
        let spec = analyzed(
            "initialize_function primitives::initialize\n\
             root { child: Exactly<leaf>; tag: primitives::Str; opt: Maybe<primitives::Int>; leaf {} }",
        )
        .unwrap();
        assert_eq!(spec.support_path, "arbor_tree");
        assert_eq!(spec.module_name, "tree");

        let root = &spec.nodes[0];
        assert_eq!(root.fields[0].target, FieldTarget::Node(1));
        assert_eq!(
            root.fields[1].target,
            FieldTarget::Primitive("primitives::Str".into())
        );
        assert!(root.fields[1].is_bare_primitive());
        assert_eq!(root.fields[2].kind, Some(EdgeKind::Maybe));
        assert!(root.fields[2].is_primitive_edge());

        assert_eq!(spec.nodes[0].derived, vec![1]);
        assert_eq!(spec.nodes[1].parent, Some(0));
        assert!(spec.nodes[1].is_leaf());
        assert!(!spec.nodes[0].is_leaf());
    }

    #[test]
    fn missing_initialize_function_fails() {
        let err = analyzed("root {}").unwrap_err();
        assert!(matches!(err, SchemaError::MissingInitializeFunction));
    }

    #[test]
    fn undefined_node_reference_fails() {
        let err = analyzed("initialize_function f\nroot { child: Exactly<nonexistent>; }")
            .unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedNode { .. }));
    }

    #[test]
    fn bare_node_reference_fails() {
        let err = analyzed("initialize_function f\nroot { child: leaf; leaf {} }").unwrap_err();
        assert!(matches!(err, SchemaError::BareNodeReference { .. }));
    }

    #[test]
    fn ext_forces_primitive_interpretation() {
        let spec = analyzed(
            "initialize_function f\nroot { child: Maybe<ext leaf>; leaf {} }",
        )
        .unwrap();
        assert_eq!(
            spec.nodes[0].fields[0].target,
            FieldTarget::Primitive("leaf".into())
        );
    }

    #[test]
    fn inherited_field_collisions_fail() {
        let err = analyzed(
            "initialize_function f\nbase { name: primitives::Str; child { name: primitives::Str; } }",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::DuplicateField { ref node, ref field } if node == "child" && field == "name"
        ));
    }

    #[test]
    fn reorder_validates_names_and_reorders_all_fields() {
        let spec = analyzed(
            "initialize_function f\n\
             base { first: primitives::A; child { second: primitives::B; reorder(second, first); } }",
        )
        .unwrap();
        let child = spec.lookup("child").unwrap();
        let fields: Vec<String> = spec
            .all_fields(child)
            .into_iter()
            .map(|f| f.field.name)
            .collect();
        assert_eq!(fields, vec!["second".to_owned(), "first".to_owned()]);

        let err = analyzed(
            "initialize_function f\nroot { a: primitives::A; reorder(b); }",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOrderField { .. }));
    }

    #[test]
    fn reorder_with_omissions_appends_the_rest() {
        let spec = analyzed(
            "initialize_function f\n\
             root { a: primitives::A; b: primitives::B; c: primitives::C; reorder(c); }",
        )
        .unwrap();
        let fields: Vec<String> = spec
            .all_fields(0)
            .into_iter()
            .map(|f| f.field.name)
            .collect();
        assert_eq!(fields, vec!["c".to_owned(), "a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn error_markers_inherit() {
        let spec = analyzed(
            "initialize_function f\nbase { error; child {} }",
        )
        .unwrap();
        let child = spec.lookup("child").unwrap();
        assert!(spec.is_marked_error(child));
        assert!(!spec.nodes[child].is_error_marker);
    }
}
