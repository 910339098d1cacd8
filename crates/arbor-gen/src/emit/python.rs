// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Python emitter.
//!
//! Emits one self-contained Python module: a small embedded support
//! core (annotations, well-formedness, debug dump) plus one class per
//! node type, using real inheritance for the derivation hierarchy.
//! This secondary target does not emit (de)serialization; trees cross
//! the language boundary through the primary target's binary format
//! producer.

use std::fmt::Write;

use crate::emit::wrap_doc;
use crate::spec::{EdgeKind, OwnedField, Specification};

/// Generates the Python module for `spec`.
#[must_use]
pub fn generate(spec: &Specification) -> String {
    let mut out = String::new();
    header(&mut out, spec);
    support_core(&mut out);
    for index in 0..spec.nodes.len() {
        node_class(&mut out, spec, index);
    }
    out
}

fn docstring(out: &mut String, doc: &str, indent: &str) {
    if doc.is_empty() {
        return;
    }
    let lines = wrap_doc(doc, 76_usize.saturating_sub(indent.len()));
    if lines.len() == 1 {
        let _ = writeln!(out, "{indent}\"\"\"{}\"\"\"", lines[0]);
        return;
    }
    let _ = writeln!(out, "{indent}\"\"\"{}", lines[0]);
    for line in &lines[1..] {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{indent}{line}");
        }
    }
    let _ = writeln!(out, "{indent}\"\"\"");
}

fn header(out: &mut String, spec: &Specification) {
    if !spec.python_doc.is_empty() {
        docstring(out, &spec.python_doc, "");
    }
    let _ = writeln!(
        out,
        "# Generated by arbor-gen from the `{}` tree specification. Do not edit by hand.",
        spec.module_name
    );
    let _ = writeln!(out, "# Schema (BLAKE3): {}", spec.schema_hash);
    out.push('\n');
    for include in &spec.python_includes {
        out.push_str(include);
        out.push('\n');
    }
    if !spec.python_includes.is_empty() {
        out.push('\n');
    }
}

fn support_core(out: &mut String) {
    out.push_str(
        r#"
class NotWellFormed(Exception):
    """A tree violated a well-formedness invariant."""


class Node:
    """Base class for all generated nodes."""

    __slots__ = ['annotations']

    #: Whether this node marks a recovered parse error.
    IS_ERROR_MARKER = False

    def __init__(self):
        self.annotations = {}

    def _field_values(self):
        """(name, kind, value) triples in declared order."""
        return []

    def find_reachable(self, id_map):
        """Registers this node and its owned descendants in id_map."""
        if id(self) in id_map:
            raise NotWellFormed(
                'duplicate node of type %s in tree' % type(self).__name__)
        id_map[id(self)] = len(id_map)
        for _name, kind, value in self._field_values():
            if kind in ('exactly', 'maybe'):
                if isinstance(value, Node):
                    value.find_reachable(id_map)
            elif kind in ('list', 'non_empty_list'):
                for child in value:
                    if isinstance(child, Node):
                        child.find_reachable(id_map)

    def check_complete(self, id_map):
        """Verifies required edges, list emptiness, and link targets."""
        if self.IS_ERROR_MARKER:
            raise NotWellFormed(
                'error marker %s present in tree' % type(self).__name__)
        for name, kind, value in self._field_values():
            where = '%s of %s' % (name, type(self).__name__)
            if kind == 'exactly':
                if value is None:
                    raise NotWellFormed('required edge %s is empty' % where)
                if isinstance(value, Node):
                    value.check_complete(id_map)
            elif kind == 'maybe':
                if isinstance(value, Node):
                    value.check_complete(id_map)
            elif kind in ('list', 'non_empty_list'):
                if kind == 'non_empty_list' and not value:
                    raise NotWellFormed(
                        'edge %s must own at least one node' % where)
                for child in value:
                    if isinstance(child, Node):
                        child.check_complete(id_map)
            elif kind == 'link':
                if value is None:
                    raise NotWellFormed('link %s is not populated' % where)
                if id(value) not in id_map:
                    raise NotWellFormed(
                        'link %s does not target a node owned by this tree'
                        % where)
            elif kind == 'opt_link':
                if value is not None and id(value) not in id_map:
                    raise NotWellFormed(
                        'link %s does not target a node owned by this tree'
                        % where)

    def check_well_formed(self):
        """Raises NotWellFormed when the tree rooted here is invalid."""
        id_map = {}
        self.find_reachable(id_map)
        self.check_complete(id_map)

    def is_well_formed(self):
        """Boolean convenience over check_well_formed()."""
        try:
            self.check_well_formed()
            return True
        except NotWellFormed:
            return False

    def dump(self, indent=0, _in_link=None):
        """Returns the indented debug dump of this node."""
        if _in_link is None:
            _in_link = [False]
        pad = '  ' * indent
        pad2 = '  ' * (indent + 1)
        fields = self._field_values()
        if not fields:
            return pad + type(self).__name__ + '()\n'
        out = pad + type(self).__name__ + '(\n'
        for name, kind, value in fields:
            if kind == 'prim':
                out += pad2 + '%s: %s\n' % (name, value)
            elif kind in ('exactly', 'maybe'):
                if value is None:
                    marker = '!MISSING' if kind == 'exactly' else '-'
                    out += pad2 + '%s: %s\n' % (name, marker)
                else:
                    out += pad2 + name + ': <\n'
                    if isinstance(value, Node):
                        out += value.dump(indent + 2, _in_link)
                    else:
                        out += '  ' * (indent + 2) + str(value) + '\n'
                    out += pad2 + '>\n'
            elif kind in ('list', 'non_empty_list'):
                if not value:
                    marker = '!MISSING' if kind == 'non_empty_list' else '[]'
                    out += pad2 + '%s: %s\n' % (name, marker)
                else:
                    out += pad2 + name + ': [\n'
                    for child in value:
                        if isinstance(child, Node):
                            out += child.dump(indent + 2, _in_link)
                        else:
                            out += '  ' * (indent + 2) + str(child) + '\n'
                    out += pad2 + ']\n'
            else:
                if value is None:
                    marker = '!MISSING' if kind == 'link' else '-'
                    out += pad2 + '%s --> %s\n' % (name, marker)
                else:
                    out += pad2 + name + ' --> <\n'
                    if _in_link[0]:
                        out += '  ' * (indent + 2) + '...\n'
                    else:
                        _in_link[0] = True
                        out += value.dump(indent + 2, _in_link)
                        _in_link[0] = False
                    out += pad2 + '>\n'
        out += pad + ')\n'
        return out

    def __str__(self):
        return self.dump()

"#,
    );
}

fn kind_tag(field: &OwnedField) -> &'static str {
    match field.field.kind {
        None => "prim",
        Some(EdgeKind::Exactly) => "exactly",
        Some(EdgeKind::Maybe) => "maybe",
        Some(EdgeKind::List) => "list",
        Some(EdgeKind::NonEmptyList) => "non_empty_list",
        Some(EdgeKind::Link) => "link",
        Some(EdgeKind::OptLink) => "opt_link",
    }
}

fn node_class(out: &mut String, spec: &Specification, index: usize) {
    let node = &spec.nodes[index];
    let all_fields = spec.all_fields(index);
    let own_fields: Vec<&OwnedField> = all_fields
        .iter()
        .filter(|f| f.declared_by == index)
        .collect();
    let parent_name = node
        .parent
        .map_or("Node", |parent| spec.nodes[parent].title_name.as_str());

    out.push('\n');
    let _ = writeln!(out, "class {}({parent_name}):", node.title_name);
    docstring(out, &node.doc, "    ");
    out.push('\n');
    if node.is_error_marker {
        out.push_str("    IS_ERROR_MARKER = True\n\n");
    }

    // Slots for the fields this class itself declares.
    if own_fields.is_empty() {
        out.push_str("    __slots__ = []\n\n");
    } else {
        out.push_str("    __slots__ = [\n");
        for field in &own_fields {
            let _ = writeln!(out, "        '{}',", field.field.name);
        }
        out.push_str("    ]\n\n");
    }

    // Constructor takes all fields (ancestors first) with defaults.
    if all_fields.is_empty() {
        out.push_str("    def __init__(self):\n        super().__init__()\n");
    } else {
        out.push_str("    def __init__(\n        self,\n");
        for field in &all_fields {
            let default = match field.field.kind {
                Some(EdgeKind::List | EdgeKind::NonEmptyList) => "()",
                _ => "None",
            };
            let _ = writeln!(out, "        {}={default},", field.field.name);
        }
        out.push_str("    ):\n");
        let inherited: Vec<&OwnedField> = all_fields
            .iter()
            .filter(|f| f.declared_by != index)
            .collect();
        if inherited.is_empty() {
            out.push_str("        super().__init__()\n");
        } else {
            let names: Vec<&str> = inherited
                .iter()
                .map(|f| f.field.name.as_str())
                .collect();
            let _ = writeln!(out, "        super().__init__({})", names.join(", "));
        }
        for field in &own_fields {
            match field.field.kind {
                Some(EdgeKind::List | EdgeKind::NonEmptyList) => {
                    let _ = writeln!(
                        out,
                        "        self.{0} = list({0})",
                        field.field.name
                    );
                }
                _ => {
                    let _ = writeln!(out, "        self.{0} = {0}", field.field.name);
                }
            }
        }
    }
    out.push('\n');

    // Field metadata driving the generic support core.
    out.push_str("    def _field_values(self):\n");
    if own_fields.is_empty() {
        out.push_str("        return super()._field_values()\n");
    } else {
        out.push_str("        return super()._field_values() + [\n");
        for field in &own_fields {
            let _ = writeln!(
                out,
                "            ('{0}', '{1}', self.{0}),",
                field.field.name,
                kind_tag(field)
            );
        }
        out.push_str("        ]\n");
    }

}
