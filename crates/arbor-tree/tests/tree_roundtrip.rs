// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end runtime test over a small hand-built node model, wired
//! the same way generated code is: two node types, a primitive field,
//! an owning list, a required link, and an optional link.

use arbor_tree::cbor::{CodecError, MapReader, MapWriter, SchemaError};
use arbor_tree::{
    addr_of, deserialize_tree_with, node_ref, serialize_tree_with, Annotations, Completable,
    DeserializeError, Exactly, Link, LinkResolver, LinkTable, List, NodeRef, NodeSerde,
    NonEmptyList, NotWellFormed, OptLink, PointerMap, SerdesRegistry, SerializeError,
    TreeNode,
};

fn serialize_value(value: &i64, map: &mut MapWriter<'_>) -> Result<(), CodecError> {
    map.append_int("v", *value)
}

fn deserialize_value(map: &MapReader<'_>) -> Result<i64, SchemaError> {
    map.at("v")?.as_int()
}

#[derive(Debug, Default)]
struct Item {
    value: i64,
    children: List<Item>,
    next: OptLink<Item>,
    annotations: Annotations,
}

impl Item {
    fn new(value: i64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

impl Completable for Item {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.children.find_reachable(map)?;
        self.next.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.children.check_complete(map, "Item", "children")?;
        self.next.check_complete(map, "Item", "next")?;
        Ok(())
    }
}

impl TreeNode for Item {
    fn deep_clone(&self) -> Self {
        Self {
            value: self.value,
            children: self.children.deep_clone(),
            next: self.next.clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.children.structural_eq(&other.children)
            && self.next.identity_eq(&other.next)
    }
}

impl NodeSerde for Item {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "Item")?;
        {
            let mut sub = map.append_map("value")?;
            serialize_value(&self.value, &mut sub)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_array("children")?;
            self.children.serialize(&mut sub, ids, registry)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_map("next")?;
            self.next.serialize(&mut sub, ids)?;
            sub.close()?;
        }
        self.annotations.serialize(map, registry)?;
        Ok(())
    }

    fn deserialize_node(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<NodeRef<Self>, DeserializeError> {
        let tag = map.at("@t")?.as_string()?;
        if tag != "Item" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Item {
            value: deserialize_value(&map.at("value")?.as_map()?)?,
            children: List::deserialize(&map.at("children")?.as_array()?, links, registry)?,
            next: OptLink::deserialize(&map.at("next")?.as_map()?)?,
            annotations: Annotations::deserialize(map, registry)?,
        };
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.children.resolve_links(table)?;
        self.next.resolve(table)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Root {
    items: NonEmptyList<Item>,
    first: Link<Item>,
    annotations: Annotations,
}

impl Completable for Root {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.items.find_reachable(map)?;
        self.first.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.items.check_complete(map, "Root", "items")?;
        self.first.check_complete(map, "Root", "first")?;
        Ok(())
    }
}

impl TreeNode for Root {
    fn deep_clone(&self) -> Self {
        Self {
            items: self.items.deep_clone(),
            first: self.first.clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.items.structural_eq(&other.items) && self.first.identity_eq(&other.first)
    }
}

impl NodeSerde for Root {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "Root")?;
        {
            let mut sub = map.append_array("items")?;
            self.items.serialize(&mut sub, ids, registry)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_map("first")?;
            self.first.serialize(&mut sub, ids)?;
            sub.close()?;
        }
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
        let node = Root {
            items: NonEmptyList::deserialize(&map.at("items")?.as_array()?, links, registry)?,
            first: Link::deserialize(&map.at("first")?.as_map()?)?,
            annotations: Annotations::deserialize(map, registry)?,
        };
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.items.resolve_links(table)?;
        self.first.resolve(table)?;
        Ok(())
    }
}

/// A root with two items, a grandchild under the first item, the
/// required link at the first item, and an optional link from the
/// second item to the grandchild.
fn build_tree() -> Exactly<Root> {
    let mut root = Root::default();
    root.items.add(Item::new(1)).add(Item::new(2));

    let first = root.items.handle(0).unwrap().clone();
    first.borrow_mut().children.add(Item::new(10));
    root.first.bind(&first);

    let grandchild = first.borrow().children.handle(0).unwrap().clone();
    root.items
        .get_mut(1)
        .unwrap()
        .next
        .bind(&grandchild);

    Exactly::of(root)
}

#[derive(Debug, Clone, PartialEq)]
struct Note(String);

fn note_registry() -> SerdesRegistry {
    let mut registry = SerdesRegistry::new();
    registry.register::<Note, _, _>(
        Some("note"),
        |value, map| map.append_string("text", &value.0),
        |map| Ok(Note(map.at("text")?.as_string()?)),
    );
    registry
}

#[test]
fn empty_root_is_not_well_formed() {
    let tree: Exactly<Root> = Exactly::of(Root::default());
    assert!(!tree.is_well_formed());
    let err = tree.check_well_formed().unwrap_err();
    assert!(matches!(
        err,
        NotWellFormed::EmptyList { type_name: "Root", field: "items" }
    ));
}

#[test]
fn built_tree_validates() {
    let tree = build_tree();
    tree.check_well_formed().unwrap();
    assert!(tree.is_well_formed());
}

#[test]
fn missing_required_link_is_reported_by_field() {
    let tree = build_tree();
    tree.get_mut().unwrap().first = Link::empty();
    let err = tree.check_well_formed().unwrap_err();
    assert!(matches!(
        err,
        NotWellFormed::MissingLink { type_name: "Root", field: "first" }
    ));
}

#[test]
fn link_outside_the_tree_is_dangling() {
    let tree = build_tree();
    let stray = node_ref(Item::new(99));
    tree.get_mut().unwrap().items.get_mut(1).unwrap().next.bind(&stray);
    let err = tree.check_well_formed().unwrap_err();
    assert!(matches!(
        err,
        NotWellFormed::DanglingLink { type_name: "Item", field: "next" }
    ));
}

#[test]
fn owning_a_node_twice_is_a_duplicate() {
    let tree = build_tree();
    {
        let root = tree.get().unwrap();
        let shared = root.items.handle(0).unwrap().clone();
        drop(root);
        tree.get_mut()
            .unwrap()
            .items
            .get_mut(1)
            .unwrap()
            .children
            .add_handle(shared);
    }
    let err = tree.check_well_formed().unwrap_err();
    assert!(matches!(err, NotWellFormed::DuplicateNode { .. }));
}

#[test]
fn sequence_numbers_are_deterministic() {
    let tree = build_tree();
    let mut first_pass = PointerMap::new();
    tree.find_reachable(&mut first_pass).unwrap();
    let mut second_pass = PointerMap::new();
    tree.find_reachable(&mut second_pass).unwrap();

    let root = tree.get().unwrap();
    for handle in root.items.handles() {
        let addr = addr_of(handle);
        assert_eq!(first_pass.sequence(addr), second_pass.sequence(addr));
    }
    assert_eq!(first_pass.len(), second_pass.len());
    assert_eq!(first_pass.len(), 4);
}

#[test]
fn tree_roundtrips_with_links_and_annotations() {
    let registry = note_registry();
    let tree = build_tree();
    tree.get_mut()
        .unwrap()
        .annotations
        .set(Note("hello".into()));

    let bytes = serialize_tree_with(&tree, &registry).unwrap();
    let restored: Exactly<Root> = deserialize_tree_with(&bytes, &registry).unwrap();

    restored.check_well_formed().unwrap();
    assert!(tree
        .get()
        .unwrap()
        .structural_eq(&restored.get().unwrap()));

    // The required link survived and targets the restored first item.
    let root = restored.get().unwrap();
    let target = root.first.get().unwrap();
    assert_eq!(addr_of(&target), addr_of(root.items.handle(0).unwrap()));
    // The optional link resolved to the restored grandchild.
    let second_next = root.items.get(1).unwrap().next.get().unwrap();
    assert_eq!(second_next.borrow().value, 10);
    // The annotation came back through the registered pair.
    assert_eq!(*root.annotations.get::<Note>().unwrap(), Note("hello".into()));

    // A deserializer without the registration silently drops it.
    let bare = SerdesRegistry::new();
    let dropped: Exactly<Root> = deserialize_tree_with(&bytes, &bare).unwrap();
    assert!(!dropped.get().unwrap().annotations.has::<Note>());
}

#[test]
fn serializing_an_ill_formed_tree_fails() {
    let tree: Exactly<Root> = Exactly::of(Root::default());
    let err = serialize_tree_with(&tree, &SerdesRegistry::new()).unwrap_err();
    assert!(matches!(err, SerializeError::NotWellFormed(_)));
}

#[test]
fn deep_clone_equals_source_and_revalidates() {
    let tree = build_tree();
    // Clone a link-free subtree: the first item and its grandchild.
    let original = tree.get().unwrap();
    let item = original.items.get(0).unwrap();
    let clone = item.deep_clone();
    assert!(clone.structural_eq(&item));

    // The clone owns fresh allocations.
    let clone_child = clone.children.handle(0).unwrap();
    let source_child = item.children.handle(0).unwrap();
    assert_ne!(addr_of(clone_child), addr_of(source_child));

    // Whole-tree clone is structurally equal; its links still point at
    // the source tree, so they need rebinding before it revalidates.
    let whole = original.deep_clone();
    assert!(whole.structural_eq(&original));
    drop(item);
    drop(original);

    let rewired = Exactly::of(whole);
    {
        let mut root = rewired.get_mut().unwrap();
        let first = root.items.handle(0).unwrap().clone();
        root.first.bind(&first);
        let grandchild = first.borrow().children.handle(0).unwrap().clone();
        root.items.get_mut(1).unwrap().next.bind(&grandchild);
    }
    rewired.check_well_formed().unwrap();
}

#[test]
fn structural_equality_ignores_annotations() {
    let left = build_tree();
    let right = build_tree();
    // Links target different allocations in the two trees, so compare
    // the link-free parts.
    let mut left_item = left.get().unwrap().items.get(0).unwrap().deep_clone();
    let right_item = right.get().unwrap().items.get(0).unwrap().deep_clone();
    left_item.annotations.set(Note("only left".into()));
    assert!(left_item.structural_eq(&right_item));
}
