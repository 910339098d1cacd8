// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Integration tests for the generator pipeline: fixture schema in,
//! emitted source out.

use arbor_gen::{compile, emit};

const FIXTURE: &str = include_str!("fixtures/directory.tree");

#[test]
fn fixture_compiles_with_expected_shape() {
    let spec = compile(FIXTURE, "directory.tree").unwrap();

    assert_eq!(spec.module_name, "directory");
    assert!(spec.with_serdes());
    assert_eq!(spec.initialize_fn, "primitives::initialize");
    assert_eq!(spec.source_location.as_deref(), Some("primitives::SourceLocation"));
    assert_eq!(spec.schema_hash.len(), 64);

    let names: Vec<&str> = spec.nodes.iter().map(|n| n.snake_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["system", "drive", "entry", "file", "directory", "mount"]
    );

    let entry = spec.lookup("entry").unwrap();
    assert!(!spec.nodes[entry].is_leaf());
    assert_eq!(spec.nodes[entry].derived.len(), 3);

    // Leaves inherit the `name` field from `entry`, ancestors first.
    let file = spec.lookup("file").unwrap();
    let fields: Vec<String> = spec
        .all_fields(file)
        .into_iter()
        .map(|f| f.field.name)
        .collect();
    assert_eq!(fields, vec!["name".to_owned(), "contents".to_owned()]);
}

#[test]
fn rust_output_declares_the_node_model() {
    let spec = compile(FIXTURE, "directory.tree").unwrap();
    let source = emit::rust::generate(&spec);

    // Provenance and imports.
    assert!(source.contains("pub const SCHEMA_BLAKE3: &str ="));
    assert!(source.contains(&spec.schema_hash));
    assert!(source.contains("use arbor_tree::edge::{Exactly, Link, List, NonEmptyList};"));
    assert!(source.contains("use crate::primitives;"));
    assert!(!source.contains("directory.tree"));

    // Node model.
    assert!(source.contains("pub enum NodeType {"));
    assert!(source.contains("pub struct System {"));
    assert!(source.contains("pub drives: NonEmptyList<Drive>,"));
    assert!(source.contains("pub struct Drive {"));
    assert!(source.contains("pub letter: primitives::Letter,"));
    assert!(source.contains("pub root_dir: Exactly<Directory>,"));
    assert!(source.contains("pub enum Entry {"));
    assert!(source.contains("pub enum EntryView<'a> {"));
    assert!(source.contains("pub struct File {"));
    assert!(source.contains("pub name: primitives::Str,"));
    assert!(source.contains("pub target: Link<Directory>,"));

    // Operations.
    assert!(source.contains("impl Completable for System {"));
    assert!(source.contains("impl TreeNode for Directory {"));
    assert!(source.contains("impl NodeSerde for Mount {"));
    assert!(source.contains("map.append_string(\"@t\", \"File\")?;"));
    assert!(source.contains("fn deserialize_fields("));
    assert!(source.contains("pub fn as_file(&self) -> Option<&File> {"));
    assert!(source.contains("pub trait Visitor {"));
    assert!(source.contains("pub trait RecursiveVisitor: Sized {"));
    assert!(source.contains("pub struct Dumper<'w> {"));
    assert!(source.contains("impl fmt::Display for System {"));
}

#[test]
fn rust_output_honors_field_order_overrides() {
    let schema = "\
initialize_function primitives::initialize
base {
    first: primitives::A;
    child {
        second: primitives::B;
        reorder(second, first);
    }
}
";
    let spec = compile(schema, "reorder.tree").unwrap();
    let source = emit::rust::generate(&spec);

    let second = source.find("pub second: primitives::B,").unwrap();
    let first = source.find("pub first: primitives::A,").unwrap();
    assert!(second < first, "reorder must put `second` before `first`");
}

#[test]
fn python_output_declares_the_classes() {
    let spec = compile(FIXTURE, "directory.tree").unwrap();
    let source = emit::python::generate(&spec);

    assert!(source.contains("import primitives"));
    assert!(source.contains(&format!("# Schema (BLAKE3): {}", spec.schema_hash)));
    assert!(source.contains("class Node:"));
    assert!(source.contains("class System(Node):"));
    assert!(source.contains("class Entry(Node):"));
    assert!(source.contains("class File(Entry):"));
    assert!(source.contains("class Directory(Entry):"));
    assert!(source.contains("class Mount(Entry):"));
    assert!(source.contains("def check_well_formed(self):"));
    assert!(source.contains("def is_well_formed(self):"));
    assert!(source.contains("('drives', 'non_empty_list', self.drives),"));
    assert!(source.contains("('target', 'link', self.target),"));
    // The secondary target carries no serializer.
    assert!(!source.contains("serialize"));
}

#[test]
fn error_markers_poison_validation_in_generated_code() {
    let schema = "\
initialize_function primitives::initialize
root {
    child: Maybe<broken>;
    broken {
        error;
    }
}
";
    let spec = compile(schema, "errors.tree").unwrap();
    let source = emit::rust::generate(&spec);
    assert!(source.contains("Err(NotWellFormed::ErrorMarker { type_name: \"Broken\" })"));
}

#[test]
fn ir_dump_carries_every_node() {
    let spec = compile(FIXTURE, "directory.tree").unwrap();
    let json = serde_json::to_string_pretty(&spec).unwrap();
    for node in &spec.nodes {
        assert!(json.contains(&node.snake_name));
        assert!(json.contains(&node.title_name));
    }
    assert!(json.contains("\"schema_hash\""));
}
