// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rust emitter.
//!
//! Emits one self-contained module against the runtime support
//! library: node structs and enums, constructors, validation, copy and
//! clone, structural equality, visitors, the debug dumper, and (when
//! the schema requests it) CBOR (de)serialization.
//!
//! Inheritance maps to tagged variants: each non-leaf node becomes an
//! enum over its direct derived nodes plus a borrowed `…View` enum over
//! its transitive leaves, and leaf structs carry their ancestors'
//! fields flattened in declared order.

use std::fmt::Write;

use crate::emit::doc_comment;
use crate::emit::module_doc_comment;
use crate::spec::{EdgeKind, FieldTarget, OwnedField, Specification};

/// Generates the Rust module for `spec`.
#[must_use]
pub fn generate(spec: &Specification) -> String {
    let mut out = String::new();
    header(&mut out, spec);
    imports(&mut out, spec);
    schema_const(&mut out, spec);
    node_type_enum(&mut out, spec);
    node_view(&mut out, spec);
    for index in 0..spec.nodes.len() {
        if spec.nodes[index].is_leaf() {
            leaf(&mut out, spec, index);
        } else {
            branch(&mut out, spec, index);
        }
    }
    visitor_trait(&mut out, spec);
    recursive_visitor_trait(&mut out, spec);
    dumper(&mut out, spec);
    out
}

fn title(spec: &Specification, index: usize) -> &str {
    &spec.nodes[index].title_name
}

fn snake(spec: &Specification, index: usize) -> &str {
    &spec.nodes[index].snake_name
}

fn view_name(spec: &Specification, index: usize) -> String {
    format!("{}View", title(spec, index))
}

/// Rendered Rust type of a field.
fn field_type(spec: &Specification, field: &OwnedField) -> String {
    let inner = match &field.field.target {
        FieldTarget::Node(node) => title(spec, *node).to_owned(),
        FieldTarget::Primitive(path) => path.clone(),
    };
    match field.field.kind {
        None => inner,
        Some(kind) => format!("{}<{inner}>", kind.keyword()),
    }
}

fn header(out: &mut String, spec: &Specification) {
    module_doc_comment(out, &spec.source_doc);
    if !spec.module_doc.is_empty() {
        if !spec.source_doc.is_empty() {
            out.push_str("//!\n");
        }
        module_doc_comment(out, &spec.module_doc);
    }
    let _ = writeln!(
        out,
        "// Generated by arbor-gen from the `{}` tree specification. Do not edit by hand.",
        spec.module_name
    );
    out.push('\n');
}

fn imports(out: &mut String, spec: &Specification) {
    let support = &spec.support_path;
    out.push_str("use std::fmt;\n\n");

    if spec.with_serdes() {
        let _ = writeln!(
            out,
            "use {support}::annotation::{{Annotations, SerdesRegistry}};"
        );
        let _ = writeln!(out, "use {support}::cbor::{{MapReader, MapWriter, SchemaError}};");
    } else {
        let _ = writeln!(out, "use {support}::annotation::Annotations;");
    }

    let mut kinds: Vec<&'static str> = Vec::new();
    for node in &spec.nodes {
        for field in &node.fields {
            if let Some(kind) = field.kind {
                let keyword = kind.keyword();
                if !kinds.contains(&keyword) {
                    kinds.push(keyword);
                }
            }
        }
    }
    kinds.sort_unstable();
    if !kinds.is_empty() {
        let _ = writeln!(out, "use {support}::edge::{{{}}};", kinds.join(", "));
    }

    if spec.with_serdes() {
        let _ = writeln!(
            out,
            "use {support}::error::{{DeserializeError, NotWellFormed, SerializeError}};"
        );
        let _ = writeln!(out, "use {support}::node::{{");
        let _ = writeln!(
            out,
            "    node_ref, Completable, LinkResolver, LinkTable, NodeRef, NodeSerde, PointerMap,"
        );
        let _ = writeln!(out, "    TreeNode,");
        let _ = writeln!(out, "}};");
    } else {
        let _ = writeln!(out, "use {support}::error::NotWellFormed;");
        let _ = writeln!(out, "use {support}::node::{{Completable, PointerMap, TreeNode}};");
    }

    if !spec.includes.is_empty() {
        out.push('\n');
        for include in &spec.includes {
            out.push_str(include);
            out.push('\n');
        }
    }
    out.push('\n');
}

fn schema_const(out: &mut String, spec: &Specification) {
    doc_comment(out, "BLAKE3 digest of the schema this module was generated from.", "");
    let _ = writeln!(out, "pub const SCHEMA_BLAKE3: &str = \"{}\";\n", spec.schema_hash);
}

fn node_type_enum(out: &mut String, spec: &Specification) {
    doc_comment(out, "Enumeration of all concrete node kinds.", "");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\npub enum NodeType {\n");
    for &leaf in &spec.leaves() {
        doc_comment(out, &format!("`{}` nodes.", title(spec, leaf)), "    ");
        let _ = writeln!(out, "    {},", title(spec, leaf));
    }
    out.push_str("}\n\n");
}

fn node_view(out: &mut String, spec: &Specification) {
    doc_comment(out, "Borrowed view over any concrete node.", "");
    out.push_str("#[derive(Debug, Clone, Copy)]\npub enum NodeView<'a> {\n");
    for &leaf in &spec.leaves() {
        doc_comment(out, &format!("A `{}` node.", title(spec, leaf)), "    ");
        let _ = writeln!(out, "    {0}(&'a {0}),", title(spec, leaf));
    }
    out.push_str("}\n\n");

    out.push_str("impl<'a> NodeView<'a> {\n");
    doc_comment(out, "The concrete kind of the viewed node.", "    ");
    out.push_str("    pub fn node_type(self) -> NodeType {\n        match self {\n");
    for &leaf in &spec.leaves() {
        let _ = writeln!(
            out,
            "            NodeView::{0}(_) => NodeType::{0},",
            title(spec, leaf)
        );
    }
    out.push_str("        }\n    }\n");

    for &leaf in &spec.leaves() {
        out.push('\n');
        doc_comment(
            out,
            &format!(
                "Interprets this view as a `{}`. Returns `None` for any other kind.",
                title(spec, leaf)
            ),
            "    ",
        );
        let _ = writeln!(
            out,
            "    pub fn as_{}(self) -> Option<&'a {}> {{",
            snake(spec, leaf),
            title(spec, leaf)
        );
        if spec.leaves().len() == 1 {
            let _ = writeln!(out, "        let NodeView::{}(node) = self;", title(spec, leaf));
            out.push_str("        Some(node)\n");
        } else {
            out.push_str("        match self {\n");
            let _ = writeln!(
                out,
                "            NodeView::{}(node) => Some(node),",
                title(spec, leaf)
            );
            out.push_str("            _ => None,\n        }\n");
        }
        out.push_str("    }\n");
    }

    out.push('\n');
    doc_comment(out, "Dispatches to the visitor method for the viewed kind.", "    ");
    out.push_str(
        "    pub fn visit<V: Visitor>(self, visitor: &mut V) -> V::Output {\n        match self {\n",
    );
    for &leaf in &spec.leaves() {
        let _ = writeln!(
            out,
            "            NodeView::{}(node) => visitor.visit_{}(node),",
            title(spec, leaf),
            snake(spec, leaf)
        );
    }
    out.push_str("        }\n    }\n\n");
    doc_comment(
        out,
        "Dispatches to the recursive visitor method for the viewed kind.",
        "    ",
    );
    out.push_str(
        "    pub fn walk<V: RecursiveVisitor>(self, visitor: &mut V) {\n        match self {\n",
    );
    for &leaf in &spec.leaves() {
        let _ = writeln!(
            out,
            "            NodeView::{}(node) => visitor.visit_{}(node),",
            title(spec, leaf),
            snake(spec, leaf)
        );
    }
    out.push_str("        }\n    }\n}\n\n");
}

/// Statements visiting the owned children a field declares, for the
/// recursive visitor and for nothing else. `access` is an expression
/// yielding `&Edge`.
fn walk_field(out: &mut String, spec: &Specification, field: &OwnedField, access: &str) {
    let Some(kind) = field.field.kind else {
        return;
    };
    let FieldTarget::Node(_) = field.field.target else {
        return;
    };
    match kind {
        EdgeKind::Exactly | EdgeKind::Maybe => {
            let _ = writeln!(out, "        if let Some(child) = {access}.get() {{");
            out.push_str("            child.walk(self);\n        }\n");
        }
        EdgeKind::List | EdgeKind::NonEmptyList => {
            let _ = writeln!(out, "        for child in {access}.iter() {{");
            out.push_str("            child.walk(self);\n        }\n");
        }
        EdgeKind::Link | EdgeKind::OptLink => {}
    }
}

fn leaf(out: &mut String, spec: &Specification, index: usize) {
    let name = title(spec, index).to_owned();
    let fields = spec.all_fields(index);

    // Struct definition.
    doc_comment(out, &spec.nodes[index].doc, "");
    out.push_str("#[derive(Debug)]\n");
    let _ = writeln!(out, "pub struct {name} {{");
    for field in &fields {
        doc_comment(out, &field.field.doc, "    ");
        let _ = writeln!(out, "    pub {}: {},", field.field.name, field_type(spec, field));
    }
    doc_comment(out, "Side data attached to this node.", "    ");
    out.push_str("    pub annotations: Annotations,\n}\n\n");

    // Inherent methods.
    let _ = writeln!(out, "impl {name} {{");
    if !fields.is_empty() {
        doc_comment(out, "Creates a node with the given fields.", "    ");
        let params: Vec<String> = fields
            .iter()
            .map(|f| format!("{}: {}", f.field.name, field_type(spec, f)))
            .collect();
        let _ = writeln!(out, "    pub fn new({}) -> Self {{", params.join(", "));
        out.push_str("        Self {\n");
        for field in &fields {
            let _ = writeln!(out, "            {},", field.field.name);
        }
        out.push_str("            annotations: Annotations::new(),\n        }\n    }\n\n");
    }

    doc_comment(out, "The concrete kind of this node.", "    ");
    let _ = writeln!(
        out,
        "    pub fn node_type(&self) -> NodeType {{\n        NodeType::{name}\n    }}\n"
    );

    doc_comment(
        out,
        "Shallow copy: a new node sharing the same children and annotation slots.",
        "    ",
    );
    out.push_str("    pub fn copy(&self) -> Self {\n        Self {\n");
    for field in &fields {
        let _ = writeln!(
            out,
            "            {0}: self.{0}.clone(),",
            field.field.name
        );
    }
    out.push_str("            annotations: self.annotations.clone(),\n        }\n    }\n\n");

    doc_comment(out, "Dispatches to the visitor method for this kind.", "    ");
    let _ = writeln!(
        out,
        "    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {{\n        visitor.visit_{}(self)\n    }}\n",
        snake(spec, index)
    );
    doc_comment(
        out,
        "Dispatches to the recursive visitor method for this kind.",
        "    ",
    );
    let _ = writeln!(
        out,
        "    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {{\n        visitor.visit_{}(self);\n    }}\n",
        snake(spec, index)
    );
    doc_comment(out, "Writes the indented debug dump of this node.", "    ");
    out.push_str(
        "    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {\n        let mut dumper = Dumper::new(out);\n        self.walk(&mut dumper);\n        dumper.finish()\n    }\n",
    );

    if spec.with_serdes() {
        out.push('\n');
        doc_comment(
            out,
            &format!("Reads the field values of a `{name}` node map."),
            "    ",
        );
        out.push_str(
            "    fn deserialize_fields(\n        map: &MapReader<'_>,\n        links: &mut LinkResolver,\n        registry: &SerdesRegistry,\n    ) -> Result<Self, DeserializeError> {\n",
        );
        let uses_links = fields
            .iter()
            .any(|f| f.field.kind.is_some_and(EdgeKind::is_owning));
        if !uses_links {
            out.push_str("        let _ = links;\n");
        }
        deserialize_fields_body(out, spec, &fields);
        out.push_str("    }\n");
    }
    out.push_str("}\n\n");

    // Default.
    let _ = writeln!(out, "impl Default for {name} {{");
    out.push_str("    fn default() -> Self {\n        Self {\n");
    for field in &fields {
        let value = match (field.field.kind, &field.field.target) {
            (None, _) => format!("{}()", spec.initialize_fn),
            (Some(EdgeKind::Exactly), _) => "Exactly::empty()".to_owned(),
            (Some(EdgeKind::Maybe), _) => "Maybe::empty()".to_owned(),
            (Some(EdgeKind::List), _) => "List::new()".to_owned(),
            (Some(EdgeKind::NonEmptyList), _) => "NonEmptyList::new()".to_owned(),
            (Some(EdgeKind::Link), _) => "Link::empty()".to_owned(),
            (Some(EdgeKind::OptLink), _) => "OptLink::empty()".to_owned(),
        };
        let _ = writeln!(out, "            {}: {},", field.field.name, value);
    }
    out.push_str("            annotations: Annotations::new(),\n        }\n    }\n}\n\n");

    // Completable.
    let _ = writeln!(out, "impl Completable for {name} {{");
    let reach: Vec<String> = fields
        .iter()
        .filter_map(|f| match (f.field.kind, &f.field.target) {
            (None, _) => None,
            (Some(EdgeKind::Link | EdgeKind::OptLink), _) | (Some(_), FieldTarget::Node(_)) => {
                Some(format!("        self.{}.find_reachable(map)?;", f.field.name))
            }
            (Some(_), FieldTarget::Primitive(_)) => Some(format!(
                "        self.{}.find_reachable_prim(map)?;",
                f.field.name
            )),
        })
        .collect();
    if reach.is_empty() {
        out.push_str(
            "    fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {\n        Ok(())\n    }\n\n",
        );
    } else {
        out.push_str(
            "    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {\n",
        );
        for line in &reach {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("        Ok(())\n    }\n\n");
    }

    if spec.is_marked_error(index) {
        out.push_str(
            "    fn check_complete(&self, _map: &PointerMap) -> Result<(), NotWellFormed> {\n",
        );
        let _ = writeln!(
            out,
            "        Err(NotWellFormed::ErrorMarker {{ type_name: \"{name}\" }})\n    }}\n}}\n"
        );
    } else {
        let complete: Vec<String> = fields
            .iter()
            .filter_map(|f| {
                let field_name = &f.field.name;
                match (f.field.kind, &f.field.target) {
                    (None, _) => None,
                    (Some(EdgeKind::Link | EdgeKind::OptLink), _)
                    | (Some(_), FieldTarget::Node(_)) => Some(format!(
                        "        self.{field_name}.check_complete(map, \"{name}\", \"{field_name}\")?;"
                    )),
                    (Some(_), FieldTarget::Primitive(_)) => Some(format!(
                        "        self.{field_name}.check_complete_prim(map, \"{name}\", \"{field_name}\")?;"
                    )),
                }
            })
            .collect();
        if complete.is_empty() {
            out.push_str(
                "    fn check_complete(&self, _map: &PointerMap) -> Result<(), NotWellFormed> {\n        Ok(())\n    }\n}\n",
            );
        } else {
            out.push_str(
                "    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {\n",
            );
            for line in &complete {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("        Ok(())\n    }\n}\n");
        }
    }
    out.push('\n');

    // TreeNode.
    let _ = writeln!(out, "impl TreeNode for {name} {{");
    out.push_str("    fn deep_clone(&self) -> Self {\n        Self {\n");
    for field in &fields {
        let value = match (field.field.kind, &field.field.target) {
            (None, _) | (Some(EdgeKind::Link | EdgeKind::OptLink), _) => {
                format!("self.{}.clone()", field.field.name)
            }
            (Some(_), FieldTarget::Node(_)) => format!("self.{}.deep_clone()", field.field.name),
            (Some(_), FieldTarget::Primitive(_)) => {
                format!("self.{}.deep_clone_prim()", field.field.name)
            }
        };
        let _ = writeln!(out, "            {}: {},", field.field.name, value);
    }
    out.push_str("            annotations: self.annotations.clone(),\n        }\n    }\n\n");

    if fields.is_empty() {
        out.push_str(
            "    fn structural_eq(&self, other: &Self) -> bool {\n        let _ = other;\n        true\n    }\n}\n\n",
        );
    } else {
        out.push_str("    fn structural_eq(&self, other: &Self) -> bool {\n");
        let clauses: Vec<String> = fields
            .iter()
            .map(|f| {
                let field_name = &f.field.name;
                match (f.field.kind, &f.field.target) {
                    (None, _) => format!("self.{field_name} == other.{field_name}"),
                    (Some(EdgeKind::Link | EdgeKind::OptLink), _) => {
                        format!("self.{field_name}.identity_eq(&other.{field_name})")
                    }
                    (Some(_), FieldTarget::Node(_)) => {
                        format!("self.{field_name}.structural_eq(&other.{field_name})")
                    }
                    (Some(_), FieldTarget::Primitive(_)) => {
                        format!("self.{field_name}.eq_prim(&other.{field_name})")
                    }
                }
            })
            .collect();
        let _ = writeln!(out, "        {}", clauses.join("\n            && "));
        out.push_str("    }\n}\n\n");
    }

    // NodeSerde.
    if spec.with_serdes() {
        node_serde_leaf(out, spec, index);
    }

    // Display.
    display_impl(out, &name);
}

fn deserialize_fields_body(out: &mut String, spec: &Specification, fields: &[OwnedField]) {
    let deserialize_fn = spec
        .deserialize_fn
        .as_deref()
        .unwrap_or_default()
        .to_owned();
    out.push_str("        Ok(Self {\n");
    for field in fields {
        let field_name = &field.field.name;
        let value = match (field.field.kind, &field.field.target) {
            (None, _) => format!(
                "{deserialize_fn}(&map.at(\"{field_name}\")?.as_map()?)?"
            ),
            (Some(EdgeKind::Link), _) => {
                format!("Link::deserialize(&map.at(\"{field_name}\")?.as_map()?)?")
            }
            (Some(EdgeKind::OptLink), _) => {
                format!("OptLink::deserialize(&map.at(\"{field_name}\")?.as_map()?)?")
            }
            (Some(EdgeKind::Exactly), FieldTarget::Node(_)) => format!(
                "Exactly::deserialize(&map.at(\"{field_name}\")?.as_map()?, links, registry)?"
            ),
            (Some(EdgeKind::Maybe), FieldTarget::Node(_)) => format!(
                "Maybe::deserialize(&map.at(\"{field_name}\")?.as_map()?, links, registry)?"
            ),
            (Some(EdgeKind::List), FieldTarget::Node(_)) => format!(
                "List::deserialize(&map.at(\"{field_name}\")?.as_array()?, links, registry)?"
            ),
            (Some(EdgeKind::NonEmptyList), FieldTarget::Node(_)) => format!(
                "NonEmptyList::deserialize(&map.at(\"{field_name}\")?.as_array()?, links, registry)?"
            ),
            (Some(EdgeKind::Exactly), FieldTarget::Primitive(_)) => format!(
                "Exactly::deserialize_prim(&map.at(\"{field_name}\")?.as_map()?, links, {deserialize_fn})?"
            ),
            (Some(EdgeKind::Maybe), FieldTarget::Primitive(_)) => format!(
                "Maybe::deserialize_prim(&map.at(\"{field_name}\")?.as_map()?, links, {deserialize_fn})?"
            ),
            (Some(EdgeKind::List), FieldTarget::Primitive(_)) => format!(
                "List::deserialize_prim(&map.at(\"{field_name}\")?.as_array()?, links, {deserialize_fn})?"
            ),
            (Some(EdgeKind::NonEmptyList), FieldTarget::Primitive(_)) => format!(
                "NonEmptyList::deserialize_prim(&map.at(\"{field_name}\")?.as_array()?, links, {deserialize_fn})?"
            ),
        };
        let _ = writeln!(out, "            {field_name}: {value},");
    }
    out.push_str("            annotations: Annotations::deserialize(map, registry)?,\n        })\n");
}

fn node_serde_leaf(out: &mut String, spec: &Specification, index: usize) {
    let name = title(spec, index).to_owned();
    let fields = spec.all_fields(index);
    let serialize_fn = spec.serialize_fn.as_deref().unwrap_or_default().to_owned();

    let _ = writeln!(out, "impl NodeSerde for {name} {{");
    out.push_str(
        "    fn serialize_node(\n        &self,\n        map: &mut MapWriter<'_>,\n        ids: &PointerMap,\n        registry: &SerdesRegistry,\n    ) -> Result<(), SerializeError> {\n",
    );
    let needs_ids = fields.iter().any(|f| f.field.kind.is_some());
    if !needs_ids {
        out.push_str("        let _ = ids;\n");
    }
    let _ = writeln!(out, "        map.append_string(\"@t\", \"{name}\")?;");
    for field in &fields {
        let field_name = &field.field.name;
        match (field.field.kind, &field.field.target) {
            (None, _) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_map(\"{field_name}\")?;\n            {serialize_fn}(&self.{field_name}, &mut sub)?;\n            sub.close()?;\n        }}"
                );
            }
            (Some(EdgeKind::Link | EdgeKind::OptLink), _) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_map(\"{field_name}\")?;\n            self.{field_name}.serialize(&mut sub, ids)?;\n            sub.close()?;\n        }}"
                );
            }
            (Some(EdgeKind::Exactly | EdgeKind::Maybe), FieldTarget::Node(_)) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_map(\"{field_name}\")?;\n            self.{field_name}.serialize(&mut sub, ids, registry)?;\n            sub.close()?;\n        }}"
                );
            }
            (Some(EdgeKind::List | EdgeKind::NonEmptyList), FieldTarget::Node(_)) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_array(\"{field_name}\")?;\n            self.{field_name}.serialize(&mut sub, ids, registry)?;\n            sub.close()?;\n        }}"
                );
            }
            (Some(EdgeKind::Exactly | EdgeKind::Maybe), FieldTarget::Primitive(_)) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_map(\"{field_name}\")?;\n            self.{field_name}.serialize_prim(&mut sub, ids, {serialize_fn})?;\n            sub.close()?;\n        }}"
                );
            }
            (Some(EdgeKind::List | EdgeKind::NonEmptyList), FieldTarget::Primitive(_)) => {
                let _ = writeln!(
                    out,
                    "        {{\n            let mut sub = map.append_array(\"{field_name}\")?;\n            self.{field_name}.serialize_prim(&mut sub, ids, {serialize_fn})?;\n            sub.close()?;\n        }}"
                );
            }
        }
    }
    out.push_str("        self.annotations.serialize(map, registry)?;\n        Ok(())\n    }\n\n");

    out.push_str(
        "    fn deserialize_node(\n        map: &MapReader<'_>,\n        links: &mut LinkResolver,\n        registry: &SerdesRegistry,\n    ) -> Result<NodeRef<Self>, DeserializeError> {\n",
    );
    out.push_str("        let tag = map.at(\"@t\")?.as_string()?;\n");
    let _ = writeln!(out, "        if tag != \"{name}\" {{");
    out.push_str(
        "            return Err(SchemaError::UnknownNodeType { found: tag }.into());\n        }\n",
    );
    out.push_str("        let node = Self::deserialize_fields(map, links, registry)?;\n");
    out.push_str("        let handle = node_ref(node);\n");
    out.push_str("        links.register(map, &handle)?;\n        Ok(handle)\n    }\n\n");

    let resolve: Vec<String> = fields
        .iter()
        .filter_map(|f| match (f.field.kind, &f.field.target) {
            (Some(EdgeKind::Link | EdgeKind::OptLink), _) => {
                Some(format!("        self.{}.resolve(table)?;", f.field.name))
            }
            (Some(_), FieldTarget::Node(_)) => Some(format!(
                "        self.{}.resolve_links(table)?;",
                f.field.name
            )),
            _ => None,
        })
        .collect();
    if resolve.is_empty() {
        out.push_str(
            "    fn resolve_links(&mut self, _table: &LinkTable) -> Result<(), SchemaError> {\n        Ok(())\n    }\n}\n\n",
        );
    } else {
        out.push_str(
            "    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {\n",
        );
        for line in &resolve {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("        Ok(())\n    }\n}\n\n");
    }
}

fn display_impl(out: &mut String, name: &str) {
    let _ = writeln!(out, "impl fmt::Display for {name} {{");
    out.push_str(
        "    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {\n        self.dump(f)\n    }\n}\n\n",
    );
}

fn branch(out: &mut String, spec: &Specification, index: usize) {
    let name = title(spec, index).to_owned();
    let view = view_name(spec, index);
    let node = &spec.nodes[index];
    let direct = node.derived.clone();
    let leaves = spec.transitive_leaves(index);
    let fields = spec.all_fields(index);

    // Enum over direct derived nodes.
    doc_comment(out, &node.doc, "");
    out.push_str("#[derive(Debug)]\n");
    let _ = writeln!(out, "pub enum {name} {{");
    for &child in &direct {
        doc_comment(out, &format!("A `{}` node.", title(spec, child)), "    ");
        let _ = writeln!(out, "    {0}({0}),", title(spec, child));
    }
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl {name} {{");
    doc_comment(out, "The concrete kind of this node.", "    ");
    out.push_str(
        "    pub fn node_type(&self) -> NodeType {\n        self.view().node_type()\n    }\n\n",
    );
    doc_comment(out, "Borrowed view for kind-generic access.", "    ");
    let _ = writeln!(out, "    pub fn view(&self) -> {view}<'_> {{");
    out.push_str("        match self {\n");
    for &child in &direct {
        if spec.nodes[child].is_leaf() {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => {view}::{0}(node),",
                title(spec, child)
            );
        } else {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => node.view().up_to_{1}(),",
                title(spec, child),
                snake(spec, index)
            );
        }
    }
    out.push_str("        }\n    }\n");

    // Field accessors.
    for field in &fields {
        out.push('\n');
        doc_comment(out, &field.field.doc, "    ");
        let _ = writeln!(
            out,
            "    pub fn {}(&self) -> &{} {{",
            field.field.name,
            field_type(spec, field)
        );
        out.push_str("        match self {\n");
        for &child in &direct {
            if spec.nodes[child].is_leaf() {
                let _ = writeln!(
                    out,
                    "            {name}::{0}(node) => &node.{1},",
                    title(spec, child),
                    field.field.name
                );
            } else {
                let _ = writeln!(
                    out,
                    "            {name}::{0}(node) => node.{1}(),",
                    title(spec, child),
                    field.field.name
                );
            }
        }
        out.push_str("        }\n    }\n");
    }

    // Downcasts.
    for &target in &leaves {
        out.push('\n');
        doc_comment(
            out,
            &format!(
                "Interprets this node as a `{}`. Returns `None` for any other kind.",
                title(spec, target)
            ),
            "    ",
        );
        let _ = writeln!(
            out,
            "    pub fn as_{}(&self) -> Option<&{}> {{",
            snake(spec, target),
            title(spec, target)
        );
        downcast_body(out, spec, index, target, false);
        out.push_str("    }\n\n");
        doc_comment(
            out,
            &format!(
                "Mutable variant of [`{name}::as_{}`].",
                snake(spec, target)
            ),
            "    ",
        );
        let _ = writeln!(
            out,
            "    pub fn as_{}_mut(&mut self) -> Option<&mut {}> {{",
            snake(spec, target),
            title(spec, target)
        );
        downcast_body(out, spec, index, target, true);
        out.push_str("    }\n");
    }

    out.push('\n');
    doc_comment(
        out,
        "Shallow copy: a new node sharing the same children and annotation slots.",
        "    ",
    );
    out.push_str("    pub fn copy(&self) -> Self {\n        match self {\n");
    for &child in &direct {
        let _ = writeln!(
            out,
            "            {name}::{0}(node) => {name}::{0}(node.copy()),",
            title(spec, child)
        );
    }
    out.push_str("        }\n    }\n\n");

    doc_comment(out, "Annotations of the underlying node.", "    ");
    out.push_str("    pub fn annotations(&self) -> &Annotations {\n        match self {\n");
    for &child in &direct {
        if spec.nodes[child].is_leaf() {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => &node.annotations,",
                title(spec, child)
            );
        } else {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => node.annotations(),",
                title(spec, child)
            );
        }
    }
    out.push_str("        }\n    }\n\n");
    doc_comment(out, "Mutable annotations of the underlying node.", "    ");
    out.push_str(
        "    pub fn annotations_mut(&mut self) -> &mut Annotations {\n        match self {\n",
    );
    for &child in &direct {
        if spec.nodes[child].is_leaf() {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => &mut node.annotations,",
                title(spec, child)
            );
        } else {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => node.annotations_mut(),",
                title(spec, child)
            );
        }
    }
    out.push_str("        }\n    }\n\n");

    doc_comment(out, "Dispatches to the visitor method for this kind.", "    ");
    out.push_str(
        "    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {\n        self.view().visit(visitor)\n    }\n\n",
    );
    doc_comment(
        out,
        "Dispatches to the recursive visitor method for this kind.",
        "    ",
    );
    out.push_str(
        "    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {\n        self.view().walk(visitor);\n    }\n\n",
    );
    doc_comment(out, "Writes the indented debug dump of this node.", "    ");
    out.push_str(
        "    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {\n        let mut dumper = Dumper::new(out);\n        self.walk(&mut dumper);\n        dumper.finish()\n    }\n}\n\n",
    );

    // View enum.
    doc_comment(
        out,
        &format!("Borrowed view over any node derived from `{name}`."),
        "",
    );
    out.push_str("#[derive(Debug, Clone, Copy)]\n");
    let _ = writeln!(out, "pub enum {view}<'a> {{");
    for &target in &leaves {
        doc_comment(out, &format!("A `{}` node.", title(spec, target)), "    ");
        let _ = writeln!(out, "    {0}(&'a {0}),", title(spec, target));
    }
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl<'a> {view}<'a> {{");
    doc_comment(out, "The concrete kind of the viewed node.", "    ");
    out.push_str("    pub fn node_type(self) -> NodeType {\n        match self {\n");
    for &target in &leaves {
        let _ = writeln!(
            out,
            "            {view}::{0}(_) => NodeType::{0},",
            title(spec, target)
        );
    }
    out.push_str("        }\n    }\n\n");

    doc_comment(out, "Upcast to the any-node view.", "    ");
    out.push_str("    pub fn upcast(self) -> NodeView<'a> {\n        match self {\n");
    for &target in &leaves {
        let _ = writeln!(
            out,
            "            {view}::{0}(node) => NodeView::{0}(node),",
            title(spec, target)
        );
    }
    out.push_str("        }\n    }\n");

    for &ancestor in &spec.ancestors(index) {
        if spec.nodes[ancestor].is_leaf() {
            continue;
        }
        out.push('\n');
        doc_comment(
            out,
            &format!("Upcast to the `{}` view.", title(spec, ancestor)),
            "    ",
        );
        let _ = writeln!(
            out,
            "    pub fn up_to_{}(self) -> {}<'a> {{",
            snake(spec, ancestor),
            view_name(spec, ancestor)
        );
        out.push_str("        match self {\n");
        for &target in &leaves {
            let _ = writeln!(
                out,
                "            {view}::{0}(node) => {1}::{0}(node),",
                title(spec, target),
                view_name(spec, ancestor)
            );
        }
        out.push_str("        }\n    }\n");
    }

    // Field accessors on the view.
    for field in &fields {
        out.push('\n');
        doc_comment(out, &field.field.doc, "    ");
        let _ = writeln!(
            out,
            "    pub fn {}(self) -> &'a {} {{",
            field.field.name,
            field_type(spec, field)
        );
        out.push_str("        match self {\n");
        for &target in &leaves {
            let _ = writeln!(
                out,
                "            {view}::{0}(node) => &node.{1},",
                title(spec, target),
                field.field.name
            );
        }
        out.push_str("        }\n    }\n");
    }

    for &target in &leaves {
        out.push('\n');
        doc_comment(
            out,
            &format!(
                "Interprets this view as a `{}`. Returns `None` for any other kind.",
                title(spec, target)
            ),
            "    ",
        );
        let _ = writeln!(
            out,
            "    pub fn as_{}(self) -> Option<&'a {}> {{",
            snake(spec, target),
            title(spec, target)
        );
        if leaves.len() == 1 {
            let _ = writeln!(out, "        let {view}::{}(node) = self;", title(spec, target));
            out.push_str("        Some(node)\n");
        } else {
            out.push_str("        match self {\n");
            let _ = writeln!(
                out,
                "            {view}::{}(node) => Some(node),",
                title(spec, target)
            );
            out.push_str("            _ => None,\n        }\n");
        }
        out.push_str("    }\n");
    }

    out.push('\n');
    doc_comment(out, "Dispatches to the visitor method for the viewed kind.", "    ");
    out.push_str(
        "    pub fn visit<V: Visitor>(self, visitor: &mut V) -> V::Output {\n        match self {\n",
    );
    for &target in &leaves {
        let _ = writeln!(
            out,
            "            {view}::{0}(node) => visitor.visit_{1}(node),",
            title(spec, target),
            snake(spec, target)
        );
    }
    out.push_str("        }\n    }\n\n");
    doc_comment(
        out,
        "Dispatches to the recursive visitor method for the viewed kind.",
        "    ",
    );
    out.push_str(
        "    pub fn walk<V: RecursiveVisitor>(self, visitor: &mut V) {\n        match self {\n",
    );
    for &target in &leaves {
        let _ = writeln!(
            out,
            "            {view}::{0}(node) => visitor.visit_{1}(node),",
            title(spec, target),
            snake(spec, target)
        );
    }
    out.push_str("        }\n    }\n}\n\n");

    // Completable.
    let _ = writeln!(out, "impl Completable for {name} {{");
    out.push_str(
        "    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {\n        match self {\n",
    );
    for &child in &direct {
        let _ = writeln!(
            out,
            "            {name}::{0}(node) => node.find_reachable(map),",
            title(spec, child)
        );
    }
    out.push_str("        }\n    }\n\n");
    out.push_str(
        "    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {\n        match self {\n",
    );
    for &child in &direct {
        let _ = writeln!(
            out,
            "            {name}::{0}(node) => node.check_complete(map),",
            title(spec, child)
        );
    }
    out.push_str("        }\n    }\n}\n\n");

    // TreeNode.
    let _ = writeln!(out, "impl TreeNode for {name} {{");
    out.push_str("    fn deep_clone(&self) -> Self {\n        match self {\n");
    for &child in &direct {
        let _ = writeln!(
            out,
            "            {name}::{0}(node) => {name}::{0}(node.deep_clone()),",
            title(spec, child)
        );
    }
    out.push_str("        }\n    }\n\n");
    out.push_str("    fn structural_eq(&self, other: &Self) -> bool {\n        match (self, other) {\n");
    for &child in &direct {
        let _ = writeln!(
            out,
            "            ({name}::{0}(a), {name}::{0}(b)) => a.structural_eq(b),",
            title(spec, child)
        );
    }
    if direct.len() > 1 {
        out.push_str("            _ => false,\n");
    }
    out.push_str("        }\n    }\n}\n\n");

    // NodeSerde.
    if spec.with_serdes() {
        let _ = writeln!(out, "impl NodeSerde for {name} {{");
        out.push_str(
            "    fn serialize_node(\n        &self,\n        map: &mut MapWriter<'_>,\n        ids: &PointerMap,\n        registry: &SerdesRegistry,\n    ) -> Result<(), SerializeError> {\n        match self {\n",
        );
        for &child in &direct {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => node.serialize_node(map, ids, registry),",
                title(spec, child)
            );
        }
        out.push_str("        }\n    }\n\n");

        out.push_str(
            "    fn deserialize_node(\n        map: &MapReader<'_>,\n        links: &mut LinkResolver,\n        registry: &SerdesRegistry,\n    ) -> Result<NodeRef<Self>, DeserializeError> {\n",
        );
        out.push_str("        let tag = map.at(\"@t\")?.as_string()?;\n");
        out.push_str("        let node = match tag.as_str() {\n");
        for &target in &leaves {
            let expr = wrap_chain(spec, index, target);
            let _ = writeln!(out, "            \"{}\" => {expr},", title(spec, target));
        }
        out.push_str(
            "            _ => return Err(SchemaError::UnknownNodeType { found: tag }.into()),\n        };\n",
        );
        out.push_str("        let handle = node_ref(node);\n");
        out.push_str("        links.register(map, &handle)?;\n        Ok(handle)\n    }\n\n");

        out.push_str(
            "    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {\n        match self {\n",
        );
        for &child in &direct {
            let _ = writeln!(
                out,
                "            {name}::{0}(node) => node.resolve_links(table),",
                title(spec, child)
            );
        }
        out.push_str("        }\n    }\n}\n\n");
    }

    display_impl(out, &name);
}

/// Body of an `as_<target>` downcast on the enum for `index`.
fn downcast_body(
    out: &mut String,
    spec: &Specification,
    index: usize,
    target: usize,
    mutable: bool,
) {
    let name = title(spec, index).to_owned();
    let suffix = if mutable { "_mut" } else { "" };
    let direct = &spec.nodes[index].derived;
    if direct.len() == 1 {
        let child = direct[0];
        if child == target || spec.transitive_leaves(child).contains(&target) {
            if spec.nodes[child].is_leaf() {
                let _ = writeln!(out, "        let {name}::{}(node) = self;", title(spec, child));
                out.push_str("        Some(node)\n");
            } else {
                let _ = writeln!(out, "        let {name}::{}(node) = self;", title(spec, child));
                let _ = writeln!(out, "        node.as_{}{suffix}()", snake(spec, target));
            }
        } else {
            out.push_str("        None\n");
        }
        return;
    }
    out.push_str("        match self {\n");
    for &child in direct {
        if child == target && spec.nodes[child].is_leaf() {
            let _ = writeln!(
                out,
                "            {name}::{}(node) => Some(node),",
                title(spec, child)
            );
        } else if !spec.nodes[child].is_leaf()
            && spec.transitive_leaves(child).contains(&target)
        {
            let _ = writeln!(
                out,
                "            {name}::{}(node) => node.as_{}{suffix}(),",
                title(spec, child),
                snake(spec, target)
            );
        }
    }
    out.push_str("            _ => None,\n        }\n");
}

/// Expression constructing the enum chain from `from` down to the leaf
/// `target` out of `deserialize_fields`, innermost first.
fn wrap_chain(spec: &Specification, from: usize, target: usize) -> String {
    let mut expr = format!(
        "{}::deserialize_fields(map, links, registry)?",
        title(spec, target)
    );
    let mut child = target;
    let mut parent = spec.nodes[target].parent;
    while let Some(step) = parent {
        expr = format!("{}::{}({expr})", title(spec, step), title(spec, child));
        if step == from {
            break;
        }
        child = step;
        parent = spec.nodes[step].parent;
    }
    expr
}

fn visitor_trait(out: &mut String, spec: &Specification) {
    doc_comment(
        out,
        "Double-dispatch visitor producing a caller-chosen output.\n\nDefault bodies fall back to the parent kind's method, terminating at the required `visit_node`; override the most specific methods you care about and call `node.visit(&mut visitor)` to dispatch.",
        "",
    );
    out.push_str("pub trait Visitor {\n");
    doc_comment(out, "Output produced per visited node.", "    ");
    out.push_str("    type Output;\n\n");
    doc_comment(out, "Fallback for nodes of any kind.", "    ");
    out.push_str("    fn visit_node(&mut self, node: NodeView<'_>) -> Self::Output;\n");

    for index in 0..spec.nodes.len() {
        let node = &spec.nodes[index];
        out.push('\n');
        if node.is_leaf() {
            doc_comment(out, &format!("Visits a `{}` node.", node.title_name), "    ");
            let _ = writeln!(
                out,
                "    fn visit_{}(&mut self, node: &{}) -> Self::Output {{",
                node.snake_name, node.title_name
            );
            match node.parent {
                Some(parent) => {
                    let _ = writeln!(
                        out,
                        "        self.visit_{}({}::{}(node))",
                        snake(spec, parent),
                        view_name(spec, parent),
                        node.title_name
                    );
                }
                None => {
                    let _ = writeln!(out, "        self.visit_node(NodeView::{}(node))", node.title_name);
                }
            }
            out.push_str("    }\n");
        } else {
            doc_comment(
                out,
                &format!("Fallback for nodes derived from `{}`.", node.title_name),
                "    ",
            );
            let _ = writeln!(
                out,
                "    fn visit_{}(&mut self, node: {}<'_>) -> Self::Output {{",
                node.snake_name,
                view_name(spec, index)
            );
            match node.parent {
                Some(parent) => {
                    let _ = writeln!(
                        out,
                        "        self.visit_{}(node.up_to_{0}())",
                        snake(spec, parent)
                    );
                }
                None => {
                    out.push_str("        self.visit_node(node.upcast())\n");
                }
            }
            out.push_str("    }\n");
        }
    }
    out.push_str("}\n\n");
}

fn recursive_visitor_trait(out: &mut String, spec: &Specification) {
    doc_comment(
        out,
        "Depth-first traversal visitor: each default body falls back to the parent kind's method and then visits the owned children this kind declares, in declared order. Links are not followed. Dispatch with `node.walk(&mut visitor)`.",
        "",
    );
    out.push_str("pub trait RecursiveVisitor: Sized {\n");
    doc_comment(out, "Fallback for nodes of any kind.", "    ");
    out.push_str("    fn visit_node(&mut self, node: NodeView<'_>) {\n        let _ = node;\n    }\n");

    for index in 0..spec.nodes.len() {
        let node = &spec.nodes[index];
        out.push('\n');
        let own_fields: Vec<OwnedField> = spec
            .all_fields(index)
            .into_iter()
            .filter(|f| f.declared_by == index)
            .collect();
        if node.is_leaf() {
            doc_comment(
                out,
                &format!("Visits a `{}` node and its owned children.", node.title_name),
                "    ",
            );
            let _ = writeln!(
                out,
                "    fn visit_{}(&mut self, node: &{}) {{",
                node.snake_name, node.title_name
            );
            match node.parent {
                Some(parent) => {
                    let _ = writeln!(
                        out,
                        "        self.visit_{}({}::{}(node));",
                        snake(spec, parent),
                        view_name(spec, parent),
                        node.title_name
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "        self.visit_node(NodeView::{}(node));",
                        node.title_name
                    );
                }
            }
            for field in &own_fields {
                walk_field(out, spec, field, &format!("node.{}", field.field.name));
            }
            out.push_str("    }\n");
        } else {
            doc_comment(
                out,
                &format!(
                    "Fallback for nodes derived from `{}`, then `{0}`'s owned children.",
                    node.title_name
                ),
                "    ",
            );
            let _ = writeln!(
                out,
                "    fn visit_{}(&mut self, node: {}<'_>) {{",
                node.snake_name,
                view_name(spec, index)
            );
            match node.parent {
                Some(parent) => {
                    let _ = writeln!(
                        out,
                        "        self.visit_{}(node.up_to_{0}());",
                        snake(spec, parent)
                    );
                }
                None => {
                    out.push_str("        self.visit_node(node.upcast());\n");
                }
            }
            for field in &own_fields {
                walk_field(out, spec, field, &format!("node.{}()", field.field.name));
            }
            out.push_str("    }\n");
        }
    }
    out.push_str("}\n\n");
}

fn dumper(out: &mut String, spec: &Specification) {
    doc_comment(
        out,
        "Visitor that writes an indented textual dump of a tree.\n\nRequired-but-empty edges print `!MISSING`, empty optionals `-`, sequences `[…]`, single-child owning edges `<…>`, and links `--> …` with nested link contents elided as `...`.",
        "",
    );
    out.push_str("pub struct Dumper<'w> {\n");
    doc_comment(out, "Output sink.", "    ");
    out.push_str("    out: &'w mut dyn fmt::Write,\n");
    doc_comment(out, "Current indentation level.", "    ");
    out.push_str("    indent: usize,\n");
    doc_comment(out, "Whether a link target is being printed.", "    ");
    out.push_str("    in_link: bool,\n");
    doc_comment(out, "First write failure, if any.", "    ");
    out.push_str("    result: fmt::Result,\n}\n\n");

    out.push_str("impl<'w> Dumper<'w> {\n");
    doc_comment(out, "Creates a dumper writing to `out`.", "    ");
    out.push_str(
        "    pub fn new(out: &'w mut dyn fmt::Write) -> Self {\n        Self {\n            out,\n            indent: 0,\n            in_link: false,\n            result: Ok(()),\n        }\n    }\n\n",
    );
    doc_comment(out, "Final write status.", "    ");
    out.push_str("    pub fn finish(self) -> fmt::Result {\n        self.result\n    }\n\n");
    out.push_str(
        "    fn write_indent(&mut self) {\n        for _ in 0..self.indent {\n            self.push(\"  \");\n        }\n    }\n\n",
    );
    out.push_str(
        "    fn push(&mut self, text: &str) {\n        if self.result.is_ok() {\n            self.result = self.out.write_str(text);\n        }\n    }\n",
    );
    let needs_push_fmt = spec.source_location.is_some()
        || spec.leaves().iter().any(|&leaf| {
            spec.all_fields(leaf)
                .iter()
                .any(|f| matches!(f.field.target, FieldTarget::Primitive(_)))
        });
    if needs_push_fmt {
        out.push_str(
            "\n    fn push_fmt(&mut self, args: fmt::Arguments<'_>) {\n        if self.result.is_ok() {\n            self.result = self.out.write_fmt(args);\n        }\n    }\n",
        );
    }
    out.push_str("}\n\n");

    out.push_str("impl RecursiveVisitor for Dumper<'_> {\n");
    out.push_str(
        "    fn visit_node(&mut self, node: NodeView<'_>) {\n        let _ = node;\n        self.write_indent();\n        self.push(\"!Node()\\n\");\n    }\n",
    );
    for &index in &spec.leaves() {
        out.push('\n');
        dump_leaf(out, spec, index);
    }
    out.push_str("}\n");
}

fn dump_leaf(out: &mut String, spec: &Specification, index: usize) {
    let name = title(spec, index).to_owned();
    let fields = spec.all_fields(index);

    let _ = writeln!(
        out,
        "    fn visit_{}(&mut self, node: &{name}) {{",
        snake(spec, index)
    );
    if fields.is_empty() && spec.source_location.is_none() {
        out.push_str("        let _ = node;\n");
    }
    out.push_str("        self.write_indent();\n");
    let _ = writeln!(out, "        self.push(\"{name}(\");");
    if fields.is_empty() {
        out.push_str("        self.push(\")\");\n");
        location_comment(out, spec);
        out.push_str("        self.push(\"\\n\");\n");
        out.push_str("    }\n");
        return;
    }
    location_comment(out, spec);
    out.push_str("        self.push(\"\\n\");\n");
    out.push_str("        self.indent += 1;\n");

    for field in &fields {
        let field_name = &field.field.name;
        let is_node = matches!(field.field.target, FieldTarget::Node(_));
        out.push_str("        self.write_indent();\n");
        match field.field.kind {
            None => {
                let _ = writeln!(
                    out,
                    "        self.push_fmt(format_args!(\"{field_name}: {{}}\\n\", node.{field_name}));"
                );
            }
            Some(kind @ (EdgeKind::Exactly | EdgeKind::Maybe)) => {
                let missing = if kind == EdgeKind::Exactly { "!MISSING" } else { "-" };
                let _ = writeln!(out, "        self.push(\"{field_name}: \");");
                let _ = writeln!(
                    out,
                    "        if let Some(child) = node.{field_name}.get() {{"
                );
                out.push_str("            self.push(\"<\\n\");\n            self.indent += 1;\n");
                if is_node {
                    out.push_str("            child.walk(self);\n");
                } else {
                    out.push_str(
                        "            self.write_indent();\n            self.push_fmt(format_args!(\"{}\\n\", *child));\n",
                    );
                }
                out.push_str(
                    "            self.indent -= 1;\n            self.write_indent();\n            self.push(\">\\n\");\n",
                );
                let _ = writeln!(
                    out,
                    "        }} else {{\n            self.push(\"{missing}\\n\");\n        }}"
                );
            }
            Some(kind @ (EdgeKind::List | EdgeKind::NonEmptyList)) => {
                let missing = if kind == EdgeKind::NonEmptyList { "!MISSING" } else { "[]" };
                let _ = writeln!(out, "        self.push(\"{field_name}: \");");
                let _ = writeln!(out, "        if node.{field_name}.is_empty() {{");
                let _ = writeln!(out, "            self.push(\"{missing}\\n\");");
                out.push_str("        } else {\n            self.push(\"[\\n\");\n            self.indent += 1;\n");
                let _ = writeln!(
                    out,
                    "            for child in node.{field_name}.iter() {{"
                );
                if is_node {
                    out.push_str("                child.walk(self);\n");
                } else {
                    out.push_str(
                        "                self.write_indent();\n                self.push_fmt(format_args!(\"{}\\n\", *child));\n",
                    );
                }
                out.push_str(
                    "            }\n            self.indent -= 1;\n            self.write_indent();\n            self.push(\"]\\n\");\n        }\n",
                );
            }
            Some(kind @ (EdgeKind::Link | EdgeKind::OptLink)) => {
                let missing = if kind == EdgeKind::Link { "!MISSING" } else { "-" };
                let _ = writeln!(out, "        self.push(\"{field_name} --> \");");
                let _ = writeln!(
                    out,
                    "        if let Some(target) = node.{field_name}.get() {{"
                );
                out.push_str("            self.push(\"<\\n\");\n            self.indent += 1;\n");
                out.push_str(
                    "            if self.in_link {\n                self.write_indent();\n                self.push(\"...\\n\");\n            } else {\n                self.in_link = true;\n                let target = target.borrow();\n",
                );
                if is_node {
                    out.push_str("                target.walk(self);\n");
                } else {
                    out.push_str(
                        "                self.write_indent();\n                self.push_fmt(format_args!(\"{}\\n\", *target));\n",
                    );
                }
                out.push_str("                self.in_link = false;\n            }\n");
                out.push_str(
                    "            self.indent -= 1;\n            self.write_indent();\n            self.push(\">\\n\");\n",
                );
                let _ = writeln!(
                    out,
                    "        }} else {{\n            self.push(\"{missing}\\n\");\n        }}"
                );
            }
        }
    }

    out.push_str("        self.indent -= 1;\n        self.write_indent();\n        self.push(\")\\n\");\n    }\n");
}

fn location_comment(out: &mut String, spec: &Specification) {
    if let Some(location) = &spec.source_location {
        let _ = writeln!(
            out,
            "        if let Ok(location) = node.annotations.get::<{location}>() {{\n            self.push_fmt(format_args!(\" # {{}}\", *location));\n        }}"
        );
    }
}
