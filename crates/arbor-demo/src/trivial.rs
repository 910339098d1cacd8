//! Trivial single-node tree used by the smoke tests.
// Generated by arbor-gen from the `trivial` tree specification. Do not edit by hand.

use std::fmt;

use arbor_tree::annotation::{Annotations, SerdesRegistry};
use arbor_tree::cbor::{MapReader, MapWriter, SchemaError};
use arbor_tree::error::{DeserializeError, NotWellFormed, SerializeError};
use arbor_tree::node::{
    node_ref, Completable, LinkResolver, LinkTable, NodeRef, NodeSerde, PointerMap,
    TreeNode,
};

/// BLAKE3 digest of the schema this module was generated from.
pub const SCHEMA_BLAKE3: &str = "4d2a9e0b7c6f8a1d3e5b9c0f2a4d6e8b1c3f5a7d9e0b2c4f6a8d0e1b3c5f7a9d";

/// Enumeration of all concrete node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// `Root` nodes.
    Root,
}

/// Borrowed view over any concrete node.
#[derive(Debug, Clone, Copy)]
pub enum NodeView<'a> {
    /// A `Root` node.
    Root(&'a Root),
}

impl<'a> NodeView<'a> {
    /// The concrete kind of the viewed node.
    pub fn node_type(self) -> NodeType {
        match self {
            NodeView::Root(_) => NodeType::Root,
        }
    }

    /// Interprets this view as a `Root`. Returns `None` for any other kind.
    pub fn as_root(self) -> Option<&'a Root> {
        let NodeView::Root(node) = self;
        Some(node)
    }

    /// Dispatches to the visitor method for the viewed kind.
    pub fn visit<V: Visitor>(self, visitor: &mut V) -> V::Output {
        match self {
            NodeView::Root(node) => visitor.visit_root(node),
        }
    }

    /// Dispatches to the recursive visitor method for the viewed kind.
    pub fn walk<V: RecursiveVisitor>(self, visitor: &mut V) {
        match self {
            NodeView::Root(node) => visitor.visit_root(node),
        }
    }
}

/// The only node.
#[derive(Debug)]
pub struct Root {
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl Root {
    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::Root
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_root(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_root(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `Root` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        let _ = links;
        Ok(Self {
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for Root {
    fn default() -> Self {
        Self {
            annotations: Annotations::new(),
        }
    }
}

impl Completable for Root {
    fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }

    fn check_complete(&self, _map: &PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }
}

impl TreeNode for Root {
    fn deep_clone(&self) -> Self {
        Self {
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        let _ = other;
        true
    }
}

impl NodeSerde for Root {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        let _ = ids;
        map.append_string("@t", "Root")?;
        self.annotations.serialize(map, registry)?;
        Ok(())
    }

    fn deserialize_node(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<NodeRef<Self>, DeserializeError> {
        let tag = map.at("@t")?.as_string()?;
        if tag != "Root" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Self::deserialize_fields(map, links, registry)?;
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, _table: &LinkTable) -> Result<(), SchemaError> {
        Ok(())
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Double-dispatch visitor producing a caller-chosen output.
///
/// Default bodies fall back to the parent kind's method, terminating at the
/// required `visit_node`; override the most specific methods you care about
/// and call `node.visit(&mut visitor)` to dispatch.
pub trait Visitor {
    /// Output produced per visited node.
    type Output;

    /// Fallback for nodes of any kind.
    fn visit_node(&mut self, node: NodeView<'_>) -> Self::Output;

    /// Visits a `Root` node.
    fn visit_root(&mut self, node: &Root) -> Self::Output {
        self.visit_node(NodeView::Root(node))
    }
}

/// Depth-first traversal visitor: each default body falls back to the parent
/// kind's method and then visits the owned children this kind declares, in
/// declared order. Links are not followed. Dispatch with
/// `node.walk(&mut visitor)`.
pub trait RecursiveVisitor: Sized {
    /// Fallback for nodes of any kind.
    fn visit_node(&mut self, node: NodeView<'_>) {
        let _ = node;
    }

    /// Visits a `Root` node and its owned children.
    fn visit_root(&mut self, node: &Root) {
        self.visit_node(NodeView::Root(node));
    }
}

/// Visitor that writes an indented textual dump of a tree.
///
/// Required-but-empty edges print `!MISSING`, empty optionals `-`, sequences
/// `[…]`, single-child owning edges `<…>`, and links `--> …` with nested
/// link contents elided as `...`.
pub struct Dumper<'w> {
    /// Output sink.
    out: &'w mut dyn fmt::Write,
    /// Current indentation level.
    indent: usize,
    /// Whether a link target is being printed.
    in_link: bool,
    /// First write failure, if any.
    result: fmt::Result,
}

impl<'w> Dumper<'w> {
    /// Creates a dumper writing to `out`.
    pub fn new(out: &'w mut dyn fmt::Write) -> Self {
        Self {
            out,
            indent: 0,
            in_link: false,
            result: Ok(()),
        }
    }

    /// Final write status.
    pub fn finish(self) -> fmt::Result {
        self.result
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.push("  ");
        }
    }

    fn push(&mut self, text: &str) {
        if self.result.is_ok() {
            self.result = self.out.write_str(text);
        }
    }
}

impl RecursiveVisitor for Dumper<'_> {
    fn visit_node(&mut self, node: NodeView<'_>) {
        let _ = node;
        self.write_indent();
        self.push("!Node()\n");
    }

    fn visit_root(&mut self, node: &Root) {
        let _ = node;
        self.write_indent();
        self.push("Root(");
        self.push(")");
        self.push("\n");
    }
}
