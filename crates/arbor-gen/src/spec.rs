// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The resolved, in-memory form of a tree schema.
//!
//! Produced by [`crate::analyze`] from the parser output; consumed by
//! the emitters. Nodes reference each other by index into
//! [`Specification::nodes`], which is topological: a node's parent
//! always precedes it.

use serde::Serialize;

/// The six edge kinds a field can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    /// Owns exactly one child.
    Exactly,
    /// Owns zero or one child.
    Maybe,
    /// Owns zero or more children in order.
    List,
    /// Owns one or more children in order.
    NonEmptyList,
    /// Non-owning, required reference.
    Link,
    /// Non-owning, optional reference.
    OptLink,
}

impl EdgeKind {
    /// The schema keyword, which doubles as the Rust edge type name.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            EdgeKind::Exactly => "Exactly",
            EdgeKind::Maybe => "Maybe",
            EdgeKind::List => "List",
            EdgeKind::NonEmptyList => "NonEmptyList",
            EdgeKind::Link => "Link",
            EdgeKind::OptLink => "OptLink",
        }
    }

    /// Parses a schema keyword.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "Exactly" => EdgeKind::Exactly,
            "Maybe" => EdgeKind::Maybe,
            "List" => EdgeKind::List,
            "NonEmptyList" => EdgeKind::NonEmptyList,
            "Link" => EdgeKind::Link,
            "OptLink" => EdgeKind::OptLink,
            _ => return None,
        })
    }

    /// Whether this kind owns its children.
    #[must_use]
    pub fn is_owning(self) -> bool {
        !self.is_link()
    }

    /// Whether this kind is a non-owning reference.
    #[must_use]
    pub fn is_link(self) -> bool {
        matches!(self, EdgeKind::Link | EdgeKind::OptLink)
    }

    /// Whether this kind holds an ordered sequence.
    #[must_use]
    pub fn is_sequence(self) -> bool {
        matches!(self, EdgeKind::List | EdgeKind::NonEmptyList)
    }
}

/// What a field points at, after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldTarget {
    /// Another schema node, by index.
    Node(usize),
    /// An opaque external primitive, by source path.
    Primitive(String),
}

impl FieldTarget {
    /// The node index, when this is a node reference.
    #[must_use]
    pub fn node(&self) -> Option<usize> {
        match self {
            FieldTarget::Node(index) => Some(*index),
            FieldTarget::Primitive(_) => None,
        }
    }
}

/// A resolved field declaration.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    /// Field name (snake_case).
    pub name: String,
    /// Documentation, empty when the schema gave none.
    pub doc: String,
    /// Edge kind; `None` for a bare primitive stored by value.
    pub kind: Option<EdgeKind>,
    /// What the field points at.
    pub target: FieldTarget,
}

impl Field {
    /// Whether this field is a bare primitive stored by value.
    #[must_use]
    pub fn is_bare_primitive(&self) -> bool {
        self.kind.is_none()
    }

    /// Whether this field is an edge (of any kind) around a primitive.
    #[must_use]
    pub fn is_primitive_edge(&self) -> bool {
        self.kind.is_some() && matches!(self.target, FieldTarget::Primitive(_))
    }
}

/// A resolved node type.
#[derive(Debug, Clone, Serialize)]
pub struct NodeType {
    /// Unique snake_case name from the schema.
    pub snake_name: String,
    /// Derived TitleCase name used in emitted types and `@t` tags.
    pub title_name: String,
    /// Documentation, empty when the schema gave none.
    pub doc: String,
    /// Parent node index, if this node derives from another.
    pub parent: Option<usize>,
    /// Indices of nodes deriving from this one, in declaration order.
    pub derived: Vec<usize>,
    /// Fields declared by this node itself, in declaration order.
    pub fields: Vec<Field>,
    /// Field-order override from `reorder`, empty when absent.
    pub order: Vec<String>,
    /// Whether this node marks a recovered parse error.
    pub is_error_marker: bool,
}

impl NodeType {
    /// Whether no node derives from this one.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.derived.is_empty()
    }
}

/// Converts a snake_case name to TitleCase.
#[must_use]
pub fn title_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    for part in snake.split('_') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// A field together with the node that declared it, as seen from some
/// (possibly derived) node.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedField {
    /// Index of the declaring node.
    pub declared_by: usize,
    /// The field itself.
    pub field: Field,
}

/// A fully resolved schema.
#[derive(Debug, Clone, Serialize)]
pub struct Specification {
    /// Emitted module name (from the `namespace` directive).
    pub module_name: String,
    /// Module documentation (from the `namespace` directive).
    pub module_doc: String,
    /// Main-output file documentation (from `source`).
    pub source_doc: String,
    /// Secondary-output file documentation (from `python`).
    pub python_doc: String,
    /// Path of the runtime support library (from `support`).
    pub support_path: String,
    /// Path of the per-primitive initialize function.
    pub initialize_fn: String,
    /// Path of the per-primitive serialize function, when serdes is on.
    pub serialize_fn: Option<String>,
    /// Path of the per-primitive deserialize function, when serdes is on.
    pub deserialize_fn: Option<String>,
    /// Annotation type dumped inline as a source location, if any.
    pub source_location: Option<String>,
    /// Verbatim lines for the main output.
    pub includes: Vec<String>,
    /// Verbatim lines for the secondary output.
    pub python_includes: Vec<String>,
    /// All node types, parents before derived.
    pub nodes: Vec<NodeType>,
    /// BLAKE3 hex digest of the schema text.
    pub schema_hash: String,
}

impl Specification {
    /// Whether (de)serialization was requested.
    #[must_use]
    pub fn with_serdes(&self) -> bool {
        self.serialize_fn.is_some()
    }

    /// Looks up a node by snake_case name.
    #[must_use]
    pub fn lookup(&self, snake_name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.snake_name == snake_name)
    }

    /// Indices of all leaf nodes, in declaration order.
    #[must_use]
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_leaf())
            .collect()
    }

    /// Indices of all non-leaf nodes, in declaration order.
    #[must_use]
    pub fn branches(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| !self.nodes[i].is_leaf())
            .collect()
    }

    /// Leaves reachable from `index` through derivation, in declaration
    /// order (`index` itself when it is a leaf).
    #[must_use]
    pub fn transitive_leaves(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(index, &mut out);
        out
    }

    fn collect_leaves(&self, index: usize, out: &mut Vec<usize>) {
        let node = &self.nodes[index];
        if node.is_leaf() {
            out.push(index);
            return;
        }
        for &derived in &node.derived {
            self.collect_leaves(derived, out);
        }
    }

    /// Ancestor chain of `index`, outermost first, excluding `index`.
    #[must_use]
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = self.nodes[index].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent].parent;
        }
        chain.reverse();
        chain
    }

    /// Whether this node, or any ancestor, is an error marker.
    #[must_use]
    pub fn is_marked_error(&self, index: usize) -> bool {
        self.nodes[index].is_error_marker
            || self
                .ancestors(index)
                .iter()
                .any(|&a| self.nodes[a].is_error_marker)
    }

    /// All fields of `index` — its ancestors' then its own, in
    /// declaration order — with the node's `reorder` override applied:
    /// listed fields first in the given order, then the rest in
    /// declared order. Order names are validated during analysis.
    #[must_use]
    pub fn all_fields(&self, index: usize) -> Vec<OwnedField> {
        let mut fields = Vec::new();
        for &ancestor in &self.ancestors(index) {
            for field in &self.nodes[ancestor].fields {
                fields.push(OwnedField {
                    declared_by: ancestor,
                    field: field.clone(),
                });
            }
        }
        for field in &self.nodes[index].fields {
            fields.push(OwnedField {
                declared_by: index,
                field: field.clone(),
            });
        }

        let order = &self.nodes[index].order;
        if order.is_empty() {
            return fields;
        }
        let mut reordered = Vec::with_capacity(fields.len());
        for name in order {
            if let Some(at) = fields.iter().position(|f| &f.field.name == name) {
                reordered.push(fields.remove(at));
            }
        }
        reordered.extend(fields);
        reordered
    }
}
