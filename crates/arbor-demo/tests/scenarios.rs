// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end scenarios over the generated filesystem tree: build,
//! validate, round-trip, break in interesting ways, and dump.

use arbor_demo::directory::{
    Directory, Drive, Entry, EntryView, File, Mount, NodeType, NodeView, RecursiveVisitor,
    System, Visitor,
};
use arbor_demo::primitives::{Letter, SourceLocation, Str};
use arbor_demo::trivial;
use arbor_tree::{
    deserialize_tree_with, node_ref, serialize_tree_with, Exactly, Link, NotWellFormed,
    SerdesRegistry, SerializeError, TreeNode,
};

/// One drive `A` whose root directory holds `File { name: "x",
/// contents: "y" }`.
fn build_system() -> Exactly<System> {
    let mut root_dir = Directory::default();
    root_dir.name = Str::new("root");
    root_dir.entries.add(Entry::File(File::new(Str::new("x"), Str::new("y"))));

    let mut drive = Drive::default();
    drive.root_dir.set(root_dir);

    let mut system = System::default();
    system.drives.add(drive);
    Exactly::of(system)
}

#[test]
fn trivial_tree_validates_roundtrips_and_dumps() {
    let tree: Exactly<trivial::Root> = Exactly::of(trivial::Root::default());
    assert!(tree.is_well_formed());

    let registry = SerdesRegistry::new();
    let bytes = serialize_tree_with(&tree, &registry).unwrap();
    let restored: Exactly<trivial::Root> = deserialize_tree_with(&bytes, &registry).unwrap();
    assert!(restored.is_well_formed());
    assert!(tree
        .get()
        .unwrap()
        .structural_eq(&restored.get().unwrap()));

    let mut out = String::new();
    tree.get().unwrap().dump(&mut out).unwrap();
    assert_eq!(out, "Root()\n");
}

#[test]
fn incomplete_system_reports_the_missing_pieces() {
    let tree: Exactly<System> = Exactly::of(System::default());
    assert!(!tree.is_well_formed());
    assert!(matches!(
        tree.check_well_formed().unwrap_err(),
        NotWellFormed::EmptyList { type_name: "System", field: "drives" }
    ));

    let mut system = System::default();
    system.drives.add(Drive::default());
    let tree = Exactly::of(system);
    assert!(matches!(
        tree.check_well_formed().unwrap_err(),
        NotWellFormed::MissingChild { type_name: "Drive", field: "root_dir" }
    ));
}

#[test]
fn built_system_validates_and_defaults_to_drive_a() {
    let tree = build_system();
    tree.check_well_formed().unwrap();
    let system = tree.get().unwrap();
    assert_eq!(system.drives.get(0).unwrap().letter, Letter('A'));
    assert_eq!(system.node_type(), NodeType::System);
}

#[test]
fn system_roundtrips_and_compares_equal() {
    let registry = SerdesRegistry::new();
    let tree = build_system();

    let bytes = serialize_tree_with(&tree, &registry).unwrap();
    let restored: Exactly<System> = deserialize_tree_with(&bytes, &registry).unwrap();
    restored.check_well_formed().unwrap();

    assert!(tree
        .get()
        .unwrap()
        .structural_eq(&restored.get().unwrap()));

    let file_name = {
        let system = restored.get().unwrap();
        let drive = system.drives.get(0).unwrap();
        let dir = drive.root_dir.get().unwrap();
        let entry = dir.entries.get(0).unwrap();
        entry.name().clone()
    };
    assert_eq!(file_name, Str::new("x"));
}

#[test]
fn mounts_resolve_after_roundtrip() {
    let registry = SerdesRegistry::new();
    let tree = build_system();

    // Mount the root directory under itself, symlink style.
    {
        let dir_handle = tree
            .get()
            .unwrap()
            .drives
            .handle(0)
            .unwrap()
            .borrow()
            .root_dir
            .handle()
            .unwrap()
            .clone();
        let system = tree.get().unwrap();
        let drive = system.drives.get(0).unwrap();
        let mut dir = drive.root_dir.get_mut().unwrap();
        dir.entries
            .add(Entry::Mount(Mount::new(Str::new("loop"), Link::to(&dir_handle))));
    }
    tree.check_well_formed().unwrap();

    let bytes = serialize_tree_with(&tree, &registry).unwrap();
    let restored: Exactly<System> = deserialize_tree_with(&bytes, &registry).unwrap();
    restored.check_well_formed().unwrap();

    // The restored mount targets the restored root directory.
    let system = restored.get().unwrap();
    let drive = system.drives.get(0).unwrap();
    let dir_handle = drive.root_dir.handle().unwrap().clone();
    let dir = drive.root_dir.get().unwrap();
    let mount_entry = dir.entries.get(1).unwrap();
    let target = mount_entry.as_mount().unwrap().target.get().unwrap();
    assert!(std::rc::Rc::ptr_eq(&target, &dir_handle));
}

#[test]
fn owning_the_same_file_twice_is_a_duplicate_node() {
    let tree = build_system();

    // Attach the file entry a second time under a fresh directory on a
    // second drive.
    let shared_entry = tree
        .get()
        .unwrap()
        .drives
        .handle(0)
        .unwrap()
        .borrow()
        .root_dir
        .get()
        .unwrap()
        .entries
        .handle(0)
        .unwrap()
        .clone();

    let mut second_root = Directory::default();
    second_root.name = Str::new("other");
    second_root.entries.add_handle(shared_entry);
    let mut second_drive = Drive::default();
    second_drive.letter = Letter('B');
    second_drive.root_dir.set(second_root);
    tree.get_mut().unwrap().drives.add(second_drive);

    assert!(!tree.is_well_formed());
    assert!(matches!(
        tree.check_well_formed().unwrap_err(),
        NotWellFormed::DuplicateNode { .. }
    ));

    // Serialization refuses the same tree.
    let err = serialize_tree_with(&tree, &SerdesRegistry::new()).unwrap_err();
    assert!(matches!(err, SerializeError::NotWellFormed(_)));
}

#[test]
fn dangling_mount_target_names_the_link_field() {
    let tree = build_system();

    let stray = node_ref(Directory::default());
    tree.get_mut()
        .unwrap()
        .drives
        .get_mut(0)
        .unwrap()
        .root_dir
        .get_mut()
        .unwrap()
        .entries
        .add(Entry::Mount(Mount::new(Str::new("bad"), Link::to(&stray))));

    assert!(!tree.is_well_formed());
    assert!(matches!(
        tree.check_well_formed().unwrap_err(),
        NotWellFormed::DanglingLink { type_name: "Mount", field: "target" }
    ));
}

#[test]
fn annotations_roundtrip_when_registered_and_drop_when_not() {
    let mut registry = SerdesRegistry::new();
    registry.register::<(i64, String), _, _>(
        Some("pair"),
        |value, map| {
            map.append_int("number", value.0)?;
            map.append_string("text", &value.1)
        },
        |map| Ok((map.at("number")?.as_int()?, map.at("text")?.as_string()?)),
    );

    let tree = build_system();
    tree.get_mut()
        .unwrap()
        .annotations
        .set((7_i64, "seven".to_owned()));

    let bytes = serialize_tree_with(&tree, &registry).unwrap();

    let restored: Exactly<System> = deserialize_tree_with(&bytes, &registry).unwrap();
    let pair = restored
        .get()
        .unwrap()
        .annotations
        .get::<(i64, String)>()
        .map(|value| value.clone());
    assert_eq!(pair.unwrap(), (7, "seven".to_owned()));

    // A deserializer without the registration drops it silently.
    let bare: Exactly<System> =
        deserialize_tree_with(&bytes, &SerdesRegistry::new()).unwrap();
    assert!(!bare.get().unwrap().annotations.has::<(i64, String)>());
}

#[test]
fn deep_clone_is_equal_and_disjoint() {
    let tree = build_system();
    let system = tree.get().unwrap();
    let clone = system.deep_clone();
    assert!(clone.structural_eq(&system));

    let original_drive = system.drives.handle(0).unwrap().clone();
    let cloned_drive = clone.drives.handle(0).unwrap().clone();
    assert!(!std::rc::Rc::ptr_eq(&original_drive, &cloned_drive));

    drop(system);
    let clone_tree = Exactly::of(clone);
    clone_tree.check_well_formed().unwrap();
}

#[test]
fn shallow_copy_shares_children() {
    let tree = build_system();
    let system = tree.get().unwrap();
    let copy = system.copy();
    assert!(std::rc::Rc::ptr_eq(
        system.drives.handle(0).unwrap(),
        copy.drives.handle(0).unwrap()
    ));
}

#[test]
fn dump_shows_the_tree_and_stays_stable() {
    let tree = build_system();
    let system = tree.get().unwrap();

    let mut first = String::new();
    system.dump(&mut first).unwrap();
    let mut second = String::new();
    system.dump(&mut second).unwrap();
    assert_eq!(first, second);

    assert!(first.contains("System("));
    assert!(first.contains("letter: A"));
    assert!(first.contains("File("));
    assert!(first.contains("\"y\""));
    assert!(first.contains("entries: ["));

    // Display renders the same dump.
    assert_eq!(system.to_string(), first);
}

#[test]
fn dump_marks_missing_pieces_and_locations() {
    let mut drive = Drive::default();
    drive
        .annotations
        .set(SourceLocation { line: 3, column: 9 });
    let mut out = String::new();
    drive.dump(&mut out).unwrap();
    assert!(out.contains("Drive( # 3:9"));
    assert!(out.contains("root_dir: !MISSING"));

    let mut mount = Mount::default();
    let mut out = String::new();
    mount.dump(&mut out).unwrap();
    assert!(out.contains("target --> !MISSING"));

    mount.target.bind(&node_ref(Directory::default()));
    let mut out = String::new();
    mount.dump(&mut out).unwrap();
    assert!(out.contains("target --> <"));
    assert!(out.contains("Directory("));
}

#[test]
fn visitors_fall_back_most_specific_first() {
    struct Kind;
    impl Visitor for Kind {
        type Output = &'static str;

        fn visit_node(&mut self, _node: NodeView<'_>) -> &'static str {
            "node"
        }

        fn visit_entry(&mut self, _node: EntryView<'_>) -> &'static str {
            "entry"
        }

        fn visit_file(&mut self, _node: &File) -> &'static str {
            "file"
        }
    }

    let mut kind = Kind;
    let file = Entry::File(File::default());
    let dir = Entry::Directory(Directory::default());
    let drive = Drive::default();

    // Most specific override wins; unhandled kinds fall back upward.
    assert_eq!(file.visit(&mut kind), "file");
    assert_eq!(dir.visit(&mut kind), "entry");
    assert_eq!(drive.visit(&mut kind), "node");
}

#[test]
fn recursive_visitor_walks_owning_edges_only() {
    struct Counter {
        nodes: usize,
        files: usize,
    }
    impl RecursiveVisitor for Counter {
        fn visit_node(&mut self, _node: NodeView<'_>) {
            self.nodes += 1;
        }

        fn visit_file(&mut self, node: &File) {
            self.files += 1;
            // Keep the fallback chain so the node is counted too.
            self.visit_entry(EntryView::File(node));
        }
    }

    let tree = build_system();
    // Add a mount so a link exists; the walk must not follow it.
    {
        let dir_handle = tree
            .get()
            .unwrap()
            .drives
            .handle(0)
            .unwrap()
            .borrow()
            .root_dir
            .handle()
            .unwrap()
            .clone();
        let system = tree.get().unwrap();
        let drive = system.drives.get(0).unwrap();
        let mut dir = drive.root_dir.get_mut().unwrap();
        dir.entries
            .add(Entry::Mount(Mount::new(Str::new("loop"), Link::to(&dir_handle))));
    }

    let mut counter = Counter { nodes: 0, files: 0 };
    tree.get().unwrap().walk(&mut counter);
    // system + drive + directory + file + mount, the directory once.
    assert_eq!(counter.nodes, 5);
    assert_eq!(counter.files, 1);
}

#[test]
fn entry_downcasts_follow_the_hierarchy() {
    let entry = Entry::File(File::new(Str::new("x"), Str::new("y")));
    assert!(entry.as_file().is_some());
    assert!(entry.as_directory().is_none());
    assert_eq!(entry.node_type(), NodeType::File);
    assert_eq!(entry.name(), &Str::new("x"));

    let view = entry.view();
    assert_eq!(view.upcast().node_type(), NodeType::File);
    assert!(view.upcast().as_file().is_some());
    assert!(view.upcast().as_system().is_none());
}
