//! Generated directory tree structures.
//!
//! Example tree capturing a tiny filesystem: drives, directories, files, and
//! mounts.
// Generated by arbor-gen from the `directory` tree specification. Do not edit by hand.

use std::fmt;

use arbor_tree::annotation::{Annotations, SerdesRegistry};
use arbor_tree::cbor::{MapReader, MapWriter, SchemaError};
use arbor_tree::edge::{Exactly, Link, List, NonEmptyList};
use arbor_tree::error::{DeserializeError, NotWellFormed, SerializeError};
use arbor_tree::node::{
    node_ref, Completable, LinkResolver, LinkTable, NodeRef, NodeSerde, PointerMap,
    TreeNode,
};

use crate::primitives;

/// BLAKE3 digest of the schema this module was generated from.
pub const SCHEMA_BLAKE3: &str = "9c1f4f6e7ab1d5b5a3c6d8e2f0917463b8a5c2d9e4f6071823946a5b0c7d8e9f";

/// Enumeration of all concrete node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// `System` nodes.
    System,
    /// `Drive` nodes.
    Drive,
    /// `File` nodes.
    File,
    /// `Directory` nodes.
    Directory,
    /// `Mount` nodes.
    Mount,
}

/// Borrowed view over any concrete node.
#[derive(Debug, Clone, Copy)]
pub enum NodeView<'a> {
    /// A `System` node.
    System(&'a System),
    /// A `Drive` node.
    Drive(&'a Drive),
    /// A `File` node.
    File(&'a File),
    /// A `Directory` node.
    Directory(&'a Directory),
    /// A `Mount` node.
    Mount(&'a Mount),
}

impl<'a> NodeView<'a> {
    /// The concrete kind of the viewed node.
    pub fn node_type(self) -> NodeType {
        match self {
            NodeView::System(_) => NodeType::System,
            NodeView::Drive(_) => NodeType::Drive,
            NodeView::File(_) => NodeType::File,
            NodeView::Directory(_) => NodeType::Directory,
            NodeView::Mount(_) => NodeType::Mount,
        }
    }

    /// Interprets this view as a `System`. Returns `None` for any other kind.
    pub fn as_system(self) -> Option<&'a System> {
        match self {
            NodeView::System(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `Drive`. Returns `None` for any other kind.
    pub fn as_drive(self) -> Option<&'a Drive> {
        match self {
            NodeView::Drive(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `File`. Returns `None` for any other kind.
    pub fn as_file(self) -> Option<&'a File> {
        match self {
            NodeView::File(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `Directory`. Returns `None` for any other
    /// kind.
    pub fn as_directory(self) -> Option<&'a Directory> {
        match self {
            NodeView::Directory(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `Mount`. Returns `None` for any other kind.
    pub fn as_mount(self) -> Option<&'a Mount> {
        match self {
            NodeView::Mount(node) => Some(node),
            _ => None,
        }
    }

    /// Dispatches to the visitor method for the viewed kind.
    pub fn visit<V: Visitor>(self, visitor: &mut V) -> V::Output {
        match self {
            NodeView::System(node) => visitor.visit_system(node),
            NodeView::Drive(node) => visitor.visit_drive(node),
            NodeView::File(node) => visitor.visit_file(node),
            NodeView::Directory(node) => visitor.visit_directory(node),
            NodeView::Mount(node) => visitor.visit_mount(node),
        }
    }

    /// Dispatches to the recursive visitor method for the viewed kind.
    pub fn walk<V: RecursiveVisitor>(self, visitor: &mut V) {
        match self {
            NodeView::System(node) => visitor.visit_system(node),
            NodeView::Drive(node) => visitor.visit_drive(node),
            NodeView::File(node) => visitor.visit_file(node),
            NodeView::Directory(node) => visitor.visit_directory(node),
            NodeView::Mount(node) => visitor.visit_mount(node),
        }
    }
}

/// Root node, containing the drives and associated directory trees.
#[derive(Debug)]
pub struct System {
    /// The drives available in the system. There must be at least one.
    pub drives: NonEmptyList<Drive>,
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl System {
    /// Creates a node with the given fields.
    pub fn new(drives: NonEmptyList<Drive>) -> Self {
        Self {
            drives,
            annotations: Annotations::new(),
        }
    }

    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::System
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            drives: self.drives.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_system(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_system(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `System` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            drives: NonEmptyList::deserialize(&map.at("drives")?.as_array()?, links, registry)?,
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for System {
    fn default() -> Self {
        Self {
            drives: NonEmptyList::new(),
            annotations: Annotations::new(),
        }
    }
}

impl Completable for System {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.drives.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.drives.check_complete(map, "System", "drives")?;
        Ok(())
    }
}

impl TreeNode for System {
    fn deep_clone(&self) -> Self {
        Self {
            drives: self.drives.deep_clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.drives.structural_eq(&other.drives)
    }
}

impl NodeSerde for System {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "System")?;
        {
            let mut sub = map.append_array("drives")?;
            self.drives.serialize(&mut sub, ids, registry)?;
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
        if tag != "System" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Self::deserialize_fields(map, links, registry)?;
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.drives.resolve_links(table)?;
        Ok(())
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Represents a drive.
#[derive(Debug)]
pub struct Drive {
    /// The drive letter used to identify it.
    pub letter: primitives::Letter,
    /// Root directory.
    pub root_dir: Exactly<Directory>,
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl Drive {
    /// Creates a node with the given fields.
    pub fn new(letter: primitives::Letter, root_dir: Exactly<Directory>) -> Self {
        Self {
            letter,
            root_dir,
            annotations: Annotations::new(),
        }
    }

    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::Drive
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            letter: self.letter.clone(),
            root_dir: self.root_dir.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_drive(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_drive(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `Drive` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            letter: primitives::deserialize(&map.at("letter")?.as_map()?)?,
            root_dir: Exactly::deserialize(&map.at("root_dir")?.as_map()?, links, registry)?,
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self {
            letter: primitives::initialize(),
            root_dir: Exactly::empty(),
            annotations: Annotations::new(),
        }
    }
}

impl Completable for Drive {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.root_dir.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.root_dir.check_complete(map, "Drive", "root_dir")?;
        Ok(())
    }
}

impl TreeNode for Drive {
    fn deep_clone(&self) -> Self {
        Self {
            letter: self.letter.clone(),
            root_dir: self.root_dir.deep_clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.letter == other.letter
            && self.root_dir.structural_eq(&other.root_dir)
    }
}

impl NodeSerde for Drive {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "Drive")?;
        {
            let mut sub = map.append_map("letter")?;
            primitives::serialize(&self.letter, &mut sub)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_map("root_dir")?;
            self.root_dir.serialize(&mut sub, ids, registry)?;
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
        if tag != "Drive" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Self::deserialize_fields(map, links, registry)?;
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.root_dir.resolve_links(table)?;
        Ok(())
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Represents a directory entry.
#[derive(Debug)]
pub enum Entry {
    /// A `File` node.
    File(File),
    /// A `Directory` node.
    Directory(Directory),
    /// A `Mount` node.
    Mount(Mount),
}

impl Entry {
    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        self.view().node_type()
    }

    /// Borrowed view for kind-generic access.
    pub fn view(&self) -> EntryView<'_> {
        match self {
            Entry::File(node) => EntryView::File(node),
            Entry::Directory(node) => EntryView::Directory(node),
            Entry::Mount(node) => EntryView::Mount(node),
        }
    }

    /// Name of the entry.
    pub fn name(&self) -> &primitives::Str {
        match self {
            Entry::File(node) => &node.name,
            Entry::Directory(node) => &node.name,
            Entry::Mount(node) => &node.name,
        }
    }

    /// Interprets this node as a `File`. Returns `None` for any other kind.
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Entry::File(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable variant of [`Entry::as_file`].
    pub fn as_file_mut(&mut self) -> Option<&mut File> {
        match self {
            Entry::File(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this node as a `Directory`. Returns `None` for any other
    /// kind.
    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Entry::Directory(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable variant of [`Entry::as_directory`].
    pub fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match self {
            Entry::Directory(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this node as a `Mount`. Returns `None` for any other kind.
    pub fn as_mount(&self) -> Option<&Mount> {
        match self {
            Entry::Mount(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable variant of [`Entry::as_mount`].
    pub fn as_mount_mut(&mut self) -> Option<&mut Mount> {
        match self {
            Entry::Mount(node) => Some(node),
            _ => None,
        }
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        match self {
            Entry::File(node) => Entry::File(node.copy()),
            Entry::Directory(node) => Entry::Directory(node.copy()),
            Entry::Mount(node) => Entry::Mount(node.copy()),
        }
    }

    /// Annotations of the underlying node.
    pub fn annotations(&self) -> &Annotations {
        match self {
            Entry::File(node) => &node.annotations,
            Entry::Directory(node) => &node.annotations,
            Entry::Mount(node) => &node.annotations,
        }
    }

    /// Mutable annotations of the underlying node.
    pub fn annotations_mut(&mut self) -> &mut Annotations {
        match self {
            Entry::File(node) => &mut node.annotations,
            Entry::Directory(node) => &mut node.annotations,
            Entry::Mount(node) => &mut node.annotations,
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        self.view().visit(visitor)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        self.view().walk(visitor);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }
}

/// Borrowed view over any node derived from `Entry`.
#[derive(Debug, Clone, Copy)]
pub enum EntryView<'a> {
    /// A `File` node.
    File(&'a File),
    /// A `Directory` node.
    Directory(&'a Directory),
    /// A `Mount` node.
    Mount(&'a Mount),
}

impl<'a> EntryView<'a> {
    /// The concrete kind of the viewed node.
    pub fn node_type(self) -> NodeType {
        match self {
            EntryView::File(_) => NodeType::File,
            EntryView::Directory(_) => NodeType::Directory,
            EntryView::Mount(_) => NodeType::Mount,
        }
    }

    /// Upcast to the any-node view.
    pub fn upcast(self) -> NodeView<'a> {
        match self {
            EntryView::File(node) => NodeView::File(node),
            EntryView::Directory(node) => NodeView::Directory(node),
            EntryView::Mount(node) => NodeView::Mount(node),
        }
    }

    /// Name of the entry.
    pub fn name(self) -> &'a primitives::Str {
        match self {
            EntryView::File(node) => &node.name,
            EntryView::Directory(node) => &node.name,
            EntryView::Mount(node) => &node.name,
        }
    }

    /// Interprets this view as a `File`. Returns `None` for any other kind.
    pub fn as_file(self) -> Option<&'a File> {
        match self {
            EntryView::File(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `Directory`. Returns `None` for any other
    /// kind.
    pub fn as_directory(self) -> Option<&'a Directory> {
        match self {
            EntryView::Directory(node) => Some(node),
            _ => None,
        }
    }

    /// Interprets this view as a `Mount`. Returns `None` for any other kind.
    pub fn as_mount(self) -> Option<&'a Mount> {
        match self {
            EntryView::Mount(node) => Some(node),
            _ => None,
        }
    }

    /// Dispatches to the visitor method for the viewed kind.
    pub fn visit<V: Visitor>(self, visitor: &mut V) -> V::Output {
        match self {
            EntryView::File(node) => visitor.visit_file(node),
            EntryView::Directory(node) => visitor.visit_directory(node),
            EntryView::Mount(node) => visitor.visit_mount(node),
        }
    }

    /// Dispatches to the recursive visitor method for the viewed kind.
    pub fn walk<V: RecursiveVisitor>(self, visitor: &mut V) {
        match self {
            EntryView::File(node) => visitor.visit_file(node),
            EntryView::Directory(node) => visitor.visit_directory(node),
            EntryView::Mount(node) => visitor.visit_mount(node),
        }
    }
}

impl Completable for Entry {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        match self {
            Entry::File(node) => node.find_reachable(map),
            Entry::Directory(node) => node.find_reachable(map),
            Entry::Mount(node) => node.find_reachable(map),
        }
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        match self {
            Entry::File(node) => node.check_complete(map),
            Entry::Directory(node) => node.check_complete(map),
            Entry::Mount(node) => node.check_complete(map),
        }
    }
}

impl TreeNode for Entry {
    fn deep_clone(&self) -> Self {
        match self {
            Entry::File(node) => Entry::File(node.deep_clone()),
            Entry::Directory(node) => Entry::Directory(node.deep_clone()),
            Entry::Mount(node) => Entry::Mount(node.deep_clone()),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::File(a), Entry::File(b)) => a.structural_eq(b),
            (Entry::Directory(a), Entry::Directory(b)) => a.structural_eq(b),
            (Entry::Mount(a), Entry::Mount(b)) => a.structural_eq(b),
            _ => false,
        }
    }
}

impl NodeSerde for Entry {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        match self {
            Entry::File(node) => node.serialize_node(map, ids, registry),
            Entry::Directory(node) => node.serialize_node(map, ids, registry),
            Entry::Mount(node) => node.serialize_node(map, ids, registry),
        }
    }

    fn deserialize_node(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<NodeRef<Self>, DeserializeError> {
        let tag = map.at("@t")?.as_string()?;
        let node = match tag.as_str() {
            "File" => Entry::File(File::deserialize_fields(map, links, registry)?),
            "Directory" => Entry::Directory(Directory::deserialize_fields(map, links, registry)?),
            "Mount" => Entry::Mount(Mount::deserialize_fields(map, links, registry)?),
            _ => return Err(SchemaError::UnknownNodeType { found: tag }.into()),
        };
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        match self {
            Entry::File(node) => node.resolve_links(table),
            Entry::Directory(node) => node.resolve_links(table),
            Entry::Mount(node) => node.resolve_links(table),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Represents a regular file.
#[derive(Debug)]
pub struct File {
    /// Name of the entry.
    pub name: primitives::Str,
    /// The file contents.
    pub contents: primitives::Str,
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl File {
    /// Creates a node with the given fields.
    pub fn new(name: primitives::Str, contents: primitives::Str) -> Self {
        Self {
            name,
            contents,
            annotations: Annotations::new(),
        }
    }

    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::File
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            contents: self.contents.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_file(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_file(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `File` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        let _ = links;
        Ok(Self {
            name: primitives::deserialize(&map.at("name")?.as_map()?)?,
            contents: primitives::deserialize(&map.at("contents")?.as_map()?)?,
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for File {
    fn default() -> Self {
        Self {
            name: primitives::initialize(),
            contents: primitives::initialize(),
            annotations: Annotations::new(),
        }
    }
}

impl Completable for File {
    fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }

    fn check_complete(&self, _map: &PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }
}

impl TreeNode for File {
    fn deep_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            contents: self.contents.clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.contents == other.contents
    }
}

impl NodeSerde for File {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        let _ = ids;
        map.append_string("@t", "File")?;
        {
            let mut sub = map.append_map("name")?;
            primitives::serialize(&self.name, &mut sub)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_map("contents")?;
            primitives::serialize(&self.contents, &mut sub)?;
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
        if tag != "File" {
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

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Represents a directory.
#[derive(Debug)]
pub struct Directory {
    /// Name of the entry.
    pub name: primitives::Str,
    /// The entries in the directory, in no particular order.
    pub entries: List<Entry>,
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl Directory {
    /// Creates a node with the given fields.
    pub fn new(name: primitives::Str, entries: List<Entry>) -> Self {
        Self {
            name,
            entries,
            annotations: Annotations::new(),
        }
    }

    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::Directory
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            entries: self.entries.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_directory(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_directory(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `Directory` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            name: primitives::deserialize(&map.at("name")?.as_map()?)?,
            entries: List::deserialize(&map.at("entries")?.as_array()?, links, registry)?,
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            name: primitives::initialize(),
            entries: List::new(),
            annotations: Annotations::new(),
        }
    }
}

impl Completable for Directory {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.entries.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.entries.check_complete(map, "Directory", "entries")?;
        Ok(())
    }
}

impl TreeNode for Directory {
    fn deep_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            entries: self.entries.deep_clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.entries.structural_eq(&other.entries)
    }
}

impl NodeSerde for Directory {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "Directory")?;
        {
            let mut sub = map.append_map("name")?;
            primitives::serialize(&self.name, &mut sub)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_array("entries")?;
            self.entries.serialize(&mut sub, ids, registry)?;
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
        if tag != "Directory" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Self::deserialize_fields(map, links, registry)?;
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.entries.resolve_links(table)?;
        Ok(())
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Represents a link to another directory entry, a la symlink.
#[derive(Debug)]
pub struct Mount {
    /// Name of the entry.
    pub name: primitives::Str,
    /// The directory linked to.
    pub target: Link<Directory>,
    /// Side data attached to this node.
    pub annotations: Annotations,
}

impl Mount {
    /// Creates a node with the given fields.
    pub fn new(name: primitives::Str, target: Link<Directory>) -> Self {
        Self {
            name,
            target,
            annotations: Annotations::new(),
        }
    }

    /// The concrete kind of this node.
    pub fn node_type(&self) -> NodeType {
        NodeType::Mount
    }

    /// Shallow copy: a new node sharing the same children and annotation
    /// slots.
    pub fn copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            target: self.target.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Dispatches to the visitor method for this kind.
    pub fn visit<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_mount(self)
    }

    /// Dispatches to the recursive visitor method for this kind.
    pub fn walk<V: RecursiveVisitor>(&self, visitor: &mut V) {
        visitor.visit_mount(self);
    }

    /// Writes the indented debug dump of this node.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut dumper = Dumper::new(out);
        self.walk(&mut dumper);
        dumper.finish()
    }

    /// Reads the field values of a `Mount` node map.
    fn deserialize_fields(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        let _ = links;
        Ok(Self {
            name: primitives::deserialize(&map.at("name")?.as_map()?)?,
            target: Link::deserialize(&map.at("target")?.as_map()?)?,
            annotations: Annotations::deserialize(map, registry)?,
        })
    }
}

impl Default for Mount {
    fn default() -> Self {
        Self {
            name: primitives::initialize(),
            target: Link::empty(),
            annotations: Annotations::new(),
        }
    }
}

impl Completable for Mount {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        self.target.find_reachable(map)?;
        Ok(())
    }

    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        self.target.check_complete(map, "Mount", "target")?;
        Ok(())
    }
}

impl TreeNode for Mount {
    fn deep_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            target: self.target.clone(),
            annotations: self.annotations.clone(),
        }
    }

    fn structural_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.target.identity_eq(&other.target)
    }
}

impl NodeSerde for Mount {
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        map.append_string("@t", "Mount")?;
        {
            let mut sub = map.append_map("name")?;
            primitives::serialize(&self.name, &mut sub)?;
            sub.close()?;
        }
        {
            let mut sub = map.append_map("target")?;
            self.target.serialize(&mut sub, ids)?;
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
        if tag != "Mount" {
            return Err(SchemaError::UnknownNodeType { found: tag }.into());
        }
        let node = Self::deserialize_fields(map, links, registry)?;
        let handle = node_ref(node);
        links.register(map, &handle)?;
        Ok(handle)
    }

    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.target.resolve(table)?;
        Ok(())
    }
}

impl fmt::Display for Mount {
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

    /// Visits a `System` node.
    fn visit_system(&mut self, node: &System) -> Self::Output {
        self.visit_node(NodeView::System(node))
    }

    /// Visits a `Drive` node.
    fn visit_drive(&mut self, node: &Drive) -> Self::Output {
        self.visit_node(NodeView::Drive(node))
    }

    /// Fallback for nodes derived from `Entry`.
    fn visit_entry(&mut self, node: EntryView<'_>) -> Self::Output {
        self.visit_node(node.upcast())
    }

    /// Visits a `File` node.
    fn visit_file(&mut self, node: &File) -> Self::Output {
        self.visit_entry(EntryView::File(node))
    }

    /// Visits a `Directory` node.
    fn visit_directory(&mut self, node: &Directory) -> Self::Output {
        self.visit_entry(EntryView::Directory(node))
    }

    /// Visits a `Mount` node.
    fn visit_mount(&mut self, node: &Mount) -> Self::Output {
        self.visit_entry(EntryView::Mount(node))
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

    /// Visits a `System` node and its owned children.
    fn visit_system(&mut self, node: &System) {
        self.visit_node(NodeView::System(node));
        for child in node.drives.iter() {
            child.walk(self);
        }
    }

    /// Visits a `Drive` node and its owned children.
    fn visit_drive(&mut self, node: &Drive) {
        self.visit_node(NodeView::Drive(node));
        if let Some(child) = node.root_dir.get() {
            child.walk(self);
        }
    }

    /// Fallback for nodes derived from `Entry`, then `Entry`'s owned
    /// children.
    fn visit_entry(&mut self, node: EntryView<'_>) {
        self.visit_node(node.upcast());
    }

    /// Visits a `File` node and its owned children.
    fn visit_file(&mut self, node: &File) {
        self.visit_entry(EntryView::File(node));
    }

    /// Visits a `Directory` node and its owned children.
    fn visit_directory(&mut self, node: &Directory) {
        self.visit_entry(EntryView::Directory(node));
        for child in node.entries.iter() {
            child.walk(self);
        }
    }

    /// Visits a `Mount` node and its owned children.
    fn visit_mount(&mut self, node: &Mount) {
        self.visit_entry(EntryView::Mount(node));
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

    fn push_fmt(&mut self, args: fmt::Arguments<'_>) {
        if self.result.is_ok() {
            self.result = self.out.write_fmt(args);
        }
    }
}

impl RecursiveVisitor for Dumper<'_> {
    fn visit_node(&mut self, node: NodeView<'_>) {
        let _ = node;
        self.write_indent();
        self.push("!Node()\n");
    }

    fn visit_system(&mut self, node: &System) {
        self.write_indent();
        self.push("System(");
        if let Ok(location) = node.annotations.get::<primitives::SourceLocation>() {
            self.push_fmt(format_args!(" # {}", *location));
        }
        self.push("\n");
        self.indent += 1;
        self.write_indent();
        self.push("drives: ");
        if node.drives.is_empty() {
            self.push("!MISSING\n");
        } else {
            self.push("[\n");
            self.indent += 1;
            for child in node.drives.iter() {
                child.walk(self);
            }
            self.indent -= 1;
            self.write_indent();
            self.push("]\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.push(")\n");
    }

    fn visit_drive(&mut self, node: &Drive) {
        self.write_indent();
        self.push("Drive(");
        if let Ok(location) = node.annotations.get::<primitives::SourceLocation>() {
            self.push_fmt(format_args!(" # {}", *location));
        }
        self.push("\n");
        self.indent += 1;
        self.write_indent();
        self.push_fmt(format_args!("letter: {}\n", node.letter));
        self.write_indent();
        self.push("root_dir: ");
        if let Some(child) = node.root_dir.get() {
            self.push("<\n");
            self.indent += 1;
            child.walk(self);
            self.indent -= 1;
            self.write_indent();
            self.push(">\n");
        } else {
            self.push("!MISSING\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.push(")\n");
    }

    fn visit_file(&mut self, node: &File) {
        self.write_indent();
        self.push("File(");
        if let Ok(location) = node.annotations.get::<primitives::SourceLocation>() {
            self.push_fmt(format_args!(" # {}", *location));
        }
        self.push("\n");
        self.indent += 1;
        self.write_indent();
        self.push_fmt(format_args!("name: {}\n", node.name));
        self.write_indent();
        self.push_fmt(format_args!("contents: {}\n", node.contents));
        self.indent -= 1;
        self.write_indent();
        self.push(")\n");
    }

    fn visit_directory(&mut self, node: &Directory) {
        self.write_indent();
        self.push("Directory(");
        if let Ok(location) = node.annotations.get::<primitives::SourceLocation>() {
            self.push_fmt(format_args!(" # {}", *location));
        }
        self.push("\n");
        self.indent += 1;
        self.write_indent();
        self.push_fmt(format_args!("name: {}\n", node.name));
        self.write_indent();
        self.push("entries: ");
        if node.entries.is_empty() {
            self.push("[]\n");
        } else {
            self.push("[\n");
            self.indent += 1;
            for child in node.entries.iter() {
                child.walk(self);
            }
            self.indent -= 1;
            self.write_indent();
            self.push("]\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.push(")\n");
    }

    fn visit_mount(&mut self, node: &Mount) {
        self.write_indent();
        self.push("Mount(");
        if let Ok(location) = node.annotations.get::<primitives::SourceLocation>() {
            self.push_fmt(format_args!(" # {}", *location));
        }
        self.push("\n");
        self.indent += 1;
        self.write_indent();
        self.push_fmt(format_args!("name: {}\n", node.name));
        self.write_indent();
        self.push("target --> ");
        if let Some(target) = node.target.get() {
            self.push("<\n");
            self.indent += 1;
            if self.in_link {
                self.write_indent();
                self.push("...\n");
            } else {
                self.in_link = true;
                let target = target.borrow();
                target.walk(self);
                self.in_link = false;
            }
            self.indent -= 1;
            self.write_indent();
            self.push(">\n");
        } else {
            self.push("!MISSING\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.push(")\n");
    }
}
