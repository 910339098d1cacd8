// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node handles, the reachability map, and the traits generated node
//! types implement.
//!
//! Nodes live in shared, reference-counted cells. Owning edges hold
//! strong handles; links hold weak handles. Ownership uniqueness is not
//! encoded in the handle type — it is enforced by the two-pass
//! well-formedness walk: pass one ([`Completable::find_reachable`])
//! assigns every owned node a sequence number in a [`PointerMap`] and
//! trips on duplicates, pass two ([`Completable::check_complete`])
//! verifies required edges and resolves link targets against the map.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use arbor_cbor::{MapReader, MapWriter, SchemaError};

use crate::annotation::SerdesRegistry;
use crate::error::{DeserializeError, NotWellFormed, SerializeError};

/// Strong, shared handle to a node.
pub type NodeRef<T> = Rc<RefCell<T>>;

/// Wraps a node value in a fresh shared handle.
pub fn node_ref<T>(value: T) -> NodeRef<T> {
    Rc::new(RefCell::new(value))
}

/// Identity of a node allocation, used as the key of the reachability
/// map and for link equality.
#[must_use]
pub fn addr_of<T>(handle: &NodeRef<T>) -> usize {
    Rc::as_ptr(handle) as *const () as usize
}

/// Identity-to-sequence-number table built during the reachability
/// pass. Sequence numbers are assigned in depth-first visit order, so
/// they are deterministic for a given tree shape.
#[derive(Debug, Default)]
pub struct PointerMap {
    map: HashMap<usize, u64>,
}

impl PointerMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no nodes have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Registers a node identity and assigns the next sequence number.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::DuplicateNode`] when the identity is
    /// already present — the node is owned through two edges.
    pub fn add(&mut self, addr: usize, type_name: &'static str) -> Result<u64, NotWellFormed> {
        let sequence = self.map.len() as u64;
        if self.map.contains_key(&addr) {
            return Err(NotWellFormed::DuplicateNode { type_name });
        }
        self.map.insert(addr, sequence);
        Ok(sequence)
    }

    /// Looks up the sequence number of a node identity.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::UnknownTarget`] when the identity
    /// was not registered — a link points outside the tree.
    pub fn get(&self, addr: usize, type_name: &'static str) -> Result<u64, NotWellFormed> {
        self.map
            .get(&addr)
            .copied()
            .ok_or(NotWellFormed::UnknownTarget { type_name })
    }

    /// Sequence number of a node identity, or `None` when unregistered.
    #[must_use]
    pub fn sequence(&self, addr: usize) -> Option<u64> {
        self.map.get(&addr).copied()
    }
}

/// The two-pass well-formedness contract, implemented by every
/// generated node type.
pub trait Completable {
    /// Pass one: register this node's owned descendants in `map`,
    /// following owning edges only, in declared field order.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::DuplicateNode`] when a node is owned
    /// twice.
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed>;

    /// Pass two: verify required edges are populated, at-least-one
    /// lists are non-empty, links resolve inside `map`, and no
    /// error-marker node is present.
    ///
    /// # Errors
    ///
    /// Fails with the corresponding [`NotWellFormed`] variant.
    fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed>;

    /// Runs both passes rooted at this node.
    ///
    /// # Errors
    ///
    /// Propagates the first violation found.
    fn check_well_formed(&self) -> Result<(), NotWellFormed> {
        let mut map = PointerMap::new();
        self.find_reachable(&mut map)?;
        self.check_complete(&map)
    }

    /// Boolean convenience over [`Completable::check_well_formed`].
    /// This is the only place a well-formedness error is dropped.
    fn is_well_formed(&self) -> bool {
        self.check_well_formed().is_ok()
    }
}

/// Deep clone and structural equality, implemented by every generated
/// node type.
pub trait TreeNode: Completable {
    /// Recursively clones this node and everything it owns. Links in
    /// the clone still refer to the source tree; rebind them when
    /// cloning a subtree that is linked into.
    fn deep_clone(&self) -> Self;

    /// Structural, annotation-ignoring equality: owning edges compare
    /// by value, links by node identity.
    fn structural_eq(&self, other: &Self) -> bool;
}

/// Self-describing serialization contract, implemented by generated
/// node types when the schema enables it.
pub trait NodeSerde: Sized {
    /// Writes this node's `@t` tag, fields in declared order, and
    /// registered annotations into `map`. The caller writes `@i`.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write or a required edge is
    /// unexpectedly empty.
    fn serialize_node(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError>;

    /// Builds a fresh node from `map`, registering it (and every owned
    /// descendant) with `links` and deferring link targets for the
    /// post-pass.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    fn deserialize_node(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<NodeRef<Self>, DeserializeError>;

    /// Post-deserialization pass: binds every deferred link through the
    /// sequence table, recursing over owning edges.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::UnknownSequence`] when a link names a
    /// sequence number no node carries.
    fn resolve_links(&mut self, table: &LinkTable) -> Result<(), SchemaError>;
}

/// Collects the `@i` sequence number of every node built during
/// deserialization. Consumed into a [`LinkTable`] once the whole tree
/// exists.
#[derive(Default)]
pub struct LinkResolver {
    nodes: HashMap<u64, Rc<dyn Any>>,
}

impl LinkResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly built node under the `@i` key of its map.
    ///
    /// # Errors
    ///
    /// Fails when `@i` is missing, negative, or already taken.
    pub fn register<T: 'static>(
        &mut self,
        map: &MapReader<'_>,
        handle: &NodeRef<T>,
    ) -> Result<(), SchemaError> {
        let raw = map.at("@i")?.as_int()?;
        let sequence = u64::try_from(raw)
            .map_err(|_| SchemaError::Invalid(format!("negative sequence number {raw}")))?;
        let any: Rc<dyn Any> = handle.clone();
        if self.nodes.insert(sequence, any).is_some() {
            return Err(SchemaError::Invalid(format!(
                "sequence number {sequence} used by more than one node"
            )));
        }
        Ok(())
    }

    /// Finalizes into the lookup table used by the link post-pass.
    #[must_use]
    pub fn into_table(self) -> LinkTable {
        LinkTable { nodes: self.nodes }
    }
}

/// Sequence-number-to-node table used to bind deferred links.
pub struct LinkTable {
    nodes: HashMap<u64, Rc<dyn Any>>,
}

impl LinkTable {
    /// Resolves a sequence number to a typed node handle.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::UnknownSequence`] when the number is
    /// unknown, or [`SchemaError::Invalid`] when the node it names has
    /// a different type than the link expects.
    pub fn lookup<T: 'static>(&self, sequence: u64) -> Result<NodeRef<T>, SchemaError> {
        let any = self
            .nodes
            .get(&sequence)
            .ok_or(SchemaError::UnknownSequence { sequence })?;
        any.clone().downcast::<RefCell<T>>().map_err(|_| {
            SchemaError::Invalid(format!(
                "link target {sequence} is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pointer_map_assigns_monotonic_sequences() {
        let mut map = PointerMap::new();
        assert_eq!(map.add(0x10, "a").unwrap(), 0);
        assert_eq!(map.add(0x20, "b").unwrap(), 1);
        assert_eq!(map.add(0x30, "c").unwrap(), 2);
        assert_eq!(map.get(0x20, "b").unwrap(), 1);
    }

    #[test]
    fn pointer_map_rejects_duplicates() {
        let mut map = PointerMap::new();
        map.add(0x10, "a").unwrap();
        let err = map.add(0x10, "a").unwrap_err();
        assert!(matches!(err, NotWellFormed::DuplicateNode { type_name: "a" }));
    }

    #[test]
    fn pointer_map_misses_are_unknown_targets() {
        let map = PointerMap::new();
        let err = map.get(0x99, "x").unwrap_err();
        assert!(matches!(err, NotWellFormed::UnknownTarget { type_name: "x" }));
    }

    #[test]
    fn link_table_lookup_is_typed() {
        let handle = node_ref(7_i32);
        let mut resolver = LinkResolver::new();
        // Register by hand: build the minimal map carrying @i.
        let mut buf = Vec::new();
        {
            let mut map = arbor_cbor::Writer::new(&mut buf).root().unwrap();
            map.append_int("@i", 0).unwrap();
            map.close().unwrap();
        }
        let reader = arbor_cbor::Reader::new(&buf).unwrap();
        resolver.register(&reader.as_map().unwrap(), &handle).unwrap();
        let table = resolver.into_table();

        let found: NodeRef<i32> = table.lookup(0).unwrap();
        assert!(Rc::ptr_eq(&found, &handle));
        assert!(matches!(
            table.lookup::<String>(0).unwrap_err(),
            SchemaError::Invalid(_)
        ));
        assert!(matches!(
            table.lookup::<i32>(1).unwrap_err(),
            SchemaError::UnknownSequence { sequence: 1 }
        ));
    }
}
