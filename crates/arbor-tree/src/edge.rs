// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The six edge value types that connect nodes.
//!
//! Owning edges ([`Exactly`], [`Maybe`], [`List`], [`NonEmptyList`])
//! hold strong handles and control the child's lifetime; link edges
//! ([`Link`], [`OptLink`]) hold weak handles to nodes owned elsewhere
//! in the same tree. `Clone` on an owning edge is shallow — it shares
//! the child handles, which is what a node-level `copy()` wants — while
//! `deep_clone` recurses. Links clone shallowly in both.
//!
//! Methods with a `_prim` suffix are the variants generated code uses
//! for edge-wrapped primitive children, which carry no tree operations
//! of their own: the edge registers the child's identity and otherwise
//! treats it as an opaque value.
//!
//! List indices follow sequence semantics: negative values count from
//! the end (−1 is the last element) and insertion positions clamp to
//! the valid range.

use std::any::type_name;
use std::cell::{Ref, RefMut};
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use arbor_cbor::{ArrayReader, ArrayWriter, CodecError, MapReader, MapWriter, SchemaError};

use crate::annotation::SerdesRegistry;
use crate::error::{DeserializeError, NotWellFormed, SerializeError};
use crate::node::{addr_of, node_ref, Completable, LinkResolver, LinkTable, NodeRef, NodeSerde, PointerMap, TreeNode};

#[allow(clippy::cast_possible_wrap)] // sequence numbers are bounded by node count
fn sequence_to_int(sequence: u64) -> i64 {
    sequence as i64
}

/// Resolves a signed index against `len`. Negative values count from
/// the end. Returns `None` when out of range.
fn resolve_index(len: usize, index: isize) -> Option<usize> {
    if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        let index = index.unsigned_abs();
        (index < len).then_some(index)
    }
}

/// Resolves a signed insertion position against `len`, clamping to
/// `[0, len]`.
fn resolve_insert_index(len: usize, index: isize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        index.unsigned_abs().min(len)
    }
}

// ---------------------------------------------------------------------------
// Exactly
// ---------------------------------------------------------------------------

/// Owning edge holding exactly one child. Empty only before
/// construction is finished; an empty `Exactly` fails validation.
#[derive(Debug)]
pub struct Exactly<T> {
    inner: Option<NodeRef<T>>,
}

impl<T> Default for Exactly<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Exactly<T> {
    /// Creates an empty edge (not yet well-formed).
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// Creates an edge owning a fresh node built from `value`.
    #[must_use]
    pub fn of(value: T) -> Self {
        Self {
            inner: Some(node_ref(value)),
        }
    }

    /// Creates an edge owning an existing handle.
    #[must_use]
    pub fn new(handle: NodeRef<T>) -> Self {
        Self { inner: Some(handle) }
    }

    /// Whether the edge is unpopulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrows the child, if populated.
    #[must_use]
    pub fn get(&self) -> Option<Ref<'_, T>> {
        self.inner.as_ref().map(|h| h.borrow())
    }

    /// Mutably borrows the child, if populated.
    #[must_use]
    pub fn get_mut(&self) -> Option<RefMut<'_, T>> {
        self.inner.as_ref().map(|h| h.borrow_mut())
    }

    /// Borrows the child.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::EmptyEdge`] when unpopulated.
    pub fn require(&self) -> Result<Ref<'_, T>, NotWellFormed> {
        self.get().ok_or(NotWellFormed::EmptyEdge {
            type_name: type_name::<T>(),
        })
    }

    /// The child handle, if populated.
    #[must_use]
    pub fn handle(&self) -> Option<&NodeRef<T>> {
        self.inner.as_ref()
    }

    /// Replaces the child with a fresh node built from `value`.
    pub fn set(&mut self, value: T) {
        self.inner = Some(node_ref(value));
    }

    /// Replaces the child with an existing handle.
    pub fn set_handle(&mut self, handle: NodeRef<T>) {
        self.inner = Some(handle);
    }

    /// Removes and returns the child handle.
    pub fn take(&mut self) -> Option<NodeRef<T>> {
        self.inner.take()
    }
}

impl<T: Completable> Exactly<T> {
    /// Registers the child and its owned descendants in `map`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        if let Some(handle) = &self.inner {
            map.add(addr_of(handle), type_name::<T>())?;
            handle.borrow().find_reachable(map)?;
        }
        Ok(())
    }

    /// Requires the edge to be populated and recurses into the child.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::MissingChild`] naming `owner.field`
    /// when empty.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        match &self.inner {
            None => Err(NotWellFormed::MissingChild {
                type_name: owner,
                field,
            }),
            Some(handle) => handle.borrow().check_complete(map),
        }
    }

    /// Runs the full two-pass validation rooted at this edge. This is
    /// the entry point for a tree held by its root edge.
    ///
    /// # Errors
    ///
    /// Propagates the first violation found.
    pub fn check_well_formed(&self) -> Result<(), NotWellFormed> {
        let mut map = PointerMap::new();
        self.find_reachable(&mut map)?;
        self.check_complete(&map, type_name::<T>(), "root")
    }

    /// Boolean convenience over [`Exactly::check_well_formed`].
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.check_well_formed().is_ok()
    }
}

impl<T: TreeNode> Exactly<T> {
    /// Recursively clones the owned child.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            inner: self
                .inner
                .as_ref()
                .map(|h| node_ref(h.borrow().deep_clone())),
        }
    }

    /// Structural equality: both empty, or both children equal.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.borrow().structural_eq(&b.borrow()),
            _ => false,
        }
    }
}

impl<T> Exactly<T> {
    /// Registers the primitive child's identity in `map`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable_prim(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        if let Some(handle) = &self.inner {
            map.add(addr_of(handle), type_name::<T>())?;
        }
        Ok(())
    }

    /// Requires the edge to be populated.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::MissingChild`] when empty.
    pub fn check_complete_prim(
        &self,
        _map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        if self.inner.is_none() {
            return Err(NotWellFormed::MissingChild {
                type_name: owner,
                field,
            });
        }
        Ok(())
    }
}

impl<T: Clone> Exactly<T> {
    /// Clones the primitive child into a fresh handle.
    #[must_use]
    pub fn deep_clone_prim(&self) -> Self {
        Self {
            inner: self.inner.as_ref().map(|h| node_ref(h.borrow().clone())),
        }
    }
}

impl<T: PartialEq> Exactly<T> {
    /// Value equality over the primitive child.
    #[must_use]
    pub fn eq_prim(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl<T: NodeSerde> Exactly<T> {
    /// Writes `@i` and the child node into `map`.
    ///
    /// # Errors
    ///
    /// Fails when the edge is empty or the codec rejects a write.
    pub fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        let handle = self.inner.as_ref().ok_or(NotWellFormed::EmptyEdge {
            type_name: type_name::<T>(),
        })?;
        let sequence = ids.get(addr_of(handle), type_name::<T>())?;
        map.append_int("@i", sequence_to_int(sequence))?;
        handle.borrow().serialize_node(map, ids, registry)
    }

    /// Reads a populated edge from a child map.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            inner: Some(T::deserialize_node(map, links, registry)?),
        })
    }

    /// Recurses the link post-pass into the child.
    ///
    /// # Errors
    ///
    /// Propagates unresolved sequence numbers.
    pub fn resolve_links(&self, table: &LinkTable) -> Result<(), SchemaError> {
        if let Some(handle) = &self.inner {
            handle.borrow_mut().resolve_links(table)?;
        }
        Ok(())
    }
}

impl<T> Exactly<T> {
    /// Writes `@i` and the primitive child through `ser`.
    ///
    /// # Errors
    ///
    /// Fails when the edge is empty or the codec rejects a write.
    pub fn serialize_prim(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        ser: impl Fn(&T, &mut MapWriter<'_>) -> Result<(), CodecError>,
    ) -> Result<(), SerializeError> {
        let handle = self.inner.as_ref().ok_or(NotWellFormed::EmptyEdge {
            type_name: type_name::<T>(),
        })?;
        let sequence = ids.get(addr_of(handle), type_name::<T>())?;
        map.append_int("@i", sequence_to_int(sequence))?;
        ser(&handle.borrow(), map)?;
        Ok(())
    }

    /// Reads a populated primitive edge, registering its `@i`.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize_prim<F>(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        des: F,
    ) -> Result<Self, DeserializeError>
    where
        T: 'static,
        F: Fn(&MapReader<'_>) -> Result<T, SchemaError>,
    {
        let handle = node_ref(des(map)?);
        links.register(map, &handle)?;
        Ok(Self {
            inner: Some(handle),
        })
    }
}

impl<T> Clone for Exactly<T> {
    /// Shallow clone: the copy shares the child handle.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Maybe
// ---------------------------------------------------------------------------

/// Owning edge holding zero or one child. Always well-formed at the
/// edge itself.
#[derive(Debug)]
pub struct Maybe<T> {
    inner: Option<NodeRef<T>>,
}

impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Maybe<T> {
    /// Creates an empty edge.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// Creates an edge owning a fresh node built from `value`.
    #[must_use]
    pub fn of(value: T) -> Self {
        Self {
            inner: Some(node_ref(value)),
        }
    }

    /// Creates an edge owning an existing handle.
    #[must_use]
    pub fn new(handle: NodeRef<T>) -> Self {
        Self { inner: Some(handle) }
    }

    /// Whether the edge is unpopulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrows the child, if populated.
    #[must_use]
    pub fn get(&self) -> Option<Ref<'_, T>> {
        self.inner.as_ref().map(|h| h.borrow())
    }

    /// Mutably borrows the child, if populated.
    #[must_use]
    pub fn get_mut(&self) -> Option<RefMut<'_, T>> {
        self.inner.as_ref().map(|h| h.borrow_mut())
    }

    /// The child handle, if populated.
    #[must_use]
    pub fn handle(&self) -> Option<&NodeRef<T>> {
        self.inner.as_ref()
    }

    /// Replaces the child with a fresh node built from `value`.
    pub fn set(&mut self, value: T) {
        self.inner = Some(node_ref(value));
    }

    /// Replaces the child with an existing handle.
    pub fn set_handle(&mut self, handle: NodeRef<T>) {
        self.inner = Some(handle);
    }

    /// Empties the edge, returning the child handle if any.
    pub fn clear(&mut self) -> Option<NodeRef<T>> {
        self.inner.take()
    }
}

impl<T: Completable> Maybe<T> {
    /// Registers the child (when present) and its owned descendants.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        if let Some(handle) = &self.inner {
            map.add(addr_of(handle), type_name::<T>())?;
            handle.borrow().find_reachable(map)?;
        }
        Ok(())
    }

    /// Recurses into the child when present; an empty `Maybe` is fine.
    ///
    /// # Errors
    ///
    /// Propagates violations from the child.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        _owner: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        if let Some(handle) = &self.inner {
            handle.borrow().check_complete(map)?;
        }
        Ok(())
    }
}

impl<T: TreeNode> Maybe<T> {
    /// Recursively clones the owned child, if any.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            inner: self
                .inner
                .as_ref()
                .map(|h| node_ref(h.borrow().deep_clone())),
        }
    }

    /// Structural equality: both empty, or both children equal.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.borrow().structural_eq(&b.borrow()),
            _ => false,
        }
    }
}

impl<T> Maybe<T> {
    /// Registers the primitive child's identity, when present.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable_prim(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        if let Some(handle) = &self.inner {
            map.add(addr_of(handle), type_name::<T>())?;
        }
        Ok(())
    }

    /// An optional primitive edge is always complete.
    ///
    /// # Errors
    ///
    /// Never fails; present for call-site uniformity.
    pub fn check_complete_prim(
        &self,
        _map: &PointerMap,
        _owner: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        Ok(())
    }
}

impl<T: Clone> Maybe<T> {
    /// Clones the primitive child into a fresh handle, if any.
    #[must_use]
    pub fn deep_clone_prim(&self) -> Self {
        Self {
            inner: self.inner.as_ref().map(|h| node_ref(h.borrow().clone())),
        }
    }
}

impl<T: PartialEq> Maybe<T> {
    /// Value equality over the primitive child.
    #[must_use]
    pub fn eq_prim(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl<T: NodeSerde> Maybe<T> {
    /// Writes the child node into `map` when present; an empty edge
    /// leaves the map empty.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write.
    pub fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        if let Some(handle) = &self.inner {
            let sequence = ids.get(addr_of(handle), type_name::<T>())?;
            map.append_int("@i", sequence_to_int(sequence))?;
            handle.borrow().serialize_node(map, ids, registry)?;
        }
        Ok(())
    }

    /// Reads an optional edge from a child map; a map without `@t` is
    /// an empty edge.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        if !map.contains("@t") {
            return Ok(Self::empty());
        }
        Ok(Self {
            inner: Some(T::deserialize_node(map, links, registry)?),
        })
    }

    /// Recurses the link post-pass into the child, if any.
    ///
    /// # Errors
    ///
    /// Propagates unresolved sequence numbers.
    pub fn resolve_links(&self, table: &LinkTable) -> Result<(), SchemaError> {
        if let Some(handle) = &self.inner {
            handle.borrow_mut().resolve_links(table)?;
        }
        Ok(())
    }
}

impl<T> Maybe<T> {
    /// Writes `@i` and the primitive child through `ser` when present;
    /// an empty edge leaves the map empty.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write.
    pub fn serialize_prim(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        ser: impl Fn(&T, &mut MapWriter<'_>) -> Result<(), CodecError>,
    ) -> Result<(), SerializeError> {
        if let Some(handle) = &self.inner {
            let sequence = ids.get(addr_of(handle), type_name::<T>())?;
            map.append_int("@i", sequence_to_int(sequence))?;
            ser(&handle.borrow(), map)?;
        }
        Ok(())
    }

    /// Reads an optional primitive edge; a map without `@i` is empty.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize_prim<F>(
        map: &MapReader<'_>,
        links: &mut LinkResolver,
        des: F,
    ) -> Result<Self, DeserializeError>
    where
        T: 'static,
        F: Fn(&MapReader<'_>) -> Result<T, SchemaError>,
    {
        if !map.contains("@i") {
            return Ok(Self::empty());
        }
        let handle = node_ref(des(map)?);
        links.register(map, &handle)?;
        Ok(Self {
            inner: Some(handle),
        })
    }
}

impl<T> Clone for Maybe<T> {
    /// Shallow clone: the copy shares the child handle.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Multi
// ---------------------------------------------------------------------------

/// Ordered sequence of owned children: the backing store shared by
/// [`List`] and [`NonEmptyList`].
#[derive(Debug)]
pub struct Multi<T> {
    items: Vec<NodeRef<T>>,
}

impl<T> Default for Multi<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Multi<T> {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends a fresh node built from `value`; chains.
    pub fn add(&mut self, value: T) -> &mut Self {
        self.items.push(node_ref(value));
        self
    }

    /// Appends an existing handle; chains.
    pub fn add_handle(&mut self, handle: NodeRef<T>) -> &mut Self {
        self.items.push(handle);
        self
    }

    /// Inserts a fresh node at a signed position (clamped).
    pub fn insert(&mut self, index: isize, value: T) {
        let at = resolve_insert_index(self.items.len(), index);
        self.items.insert(at, node_ref(value));
    }

    /// Removes and returns the child at a signed index, or `None` when
    /// out of range.
    pub fn remove(&mut self, index: isize) -> Option<NodeRef<T>> {
        let at = resolve_index(self.items.len(), index)?;
        Some(self.items.remove(at))
    }

    /// Replaces the child at a signed index, returning the old handle,
    /// or `None` (no change) when out of range.
    pub fn set(&mut self, index: isize, value: T) -> Option<NodeRef<T>> {
        let at = resolve_index(self.items.len(), index)?;
        Some(std::mem::replace(&mut self.items[at], node_ref(value)))
    }

    /// Borrows the child at a signed index.
    #[must_use]
    pub fn get(&self, index: isize) -> Option<Ref<'_, T>> {
        let at = resolve_index(self.items.len(), index)?;
        Some(self.items[at].borrow())
    }

    /// Mutably borrows the child at a signed index.
    #[must_use]
    pub fn get_mut(&self, index: isize) -> Option<RefMut<'_, T>> {
        let at = resolve_index(self.items.len(), index)?;
        Some(self.items[at].borrow_mut())
    }

    /// The handle at a signed index.
    #[must_use]
    pub fn handle(&self, index: isize) -> Option<&NodeRef<T>> {
        let at = resolve_index(self.items.len(), index)?;
        self.items.get(at)
    }

    /// All handles in order.
    #[must_use]
    pub fn handles(&self) -> &[NodeRef<T>] {
        &self.items
    }

    /// Iterates borrowed children in order.
    pub fn iter(&self) -> impl Iterator<Item = Ref<'_, T>> {
        self.items.iter().map(|h| h.borrow())
    }
}

impl<T: Completable> Multi<T> {
    /// Registers every child and its owned descendants, in order.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        for handle in &self.items {
            map.add(addr_of(handle), type_name::<T>())?;
            handle.borrow().find_reachable(map)?;
        }
        Ok(())
    }

    /// Recurses into every child.
    ///
    /// # Errors
    ///
    /// Propagates violations from the children.
    pub fn check_complete(&self, map: &PointerMap) -> Result<(), NotWellFormed> {
        for handle in &self.items {
            handle.borrow().check_complete(map)?;
        }
        Ok(())
    }
}

impl<T: TreeNode> Multi<T> {
    /// Recursively clones every child.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|h| node_ref(h.borrow().deep_clone()))
                .collect(),
        }
    }

    /// Structural equality: same length, children pairwise equal.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.borrow().structural_eq(&b.borrow()))
    }
}

impl<T> Multi<T> {
    /// Registers every primitive child's identity, in order.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ownership.
    pub fn find_reachable_prim(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        for handle in &self.items {
            map.add(addr_of(handle), type_name::<T>())?;
        }
        Ok(())
    }
}

impl<T: Clone> Multi<T> {
    /// Clones every primitive child into fresh handles.
    #[must_use]
    pub fn deep_clone_prim(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|h| node_ref(h.borrow().clone()))
                .collect(),
        }
    }
}

impl<T: PartialEq> Multi<T> {
    /// Value equality over primitive children.
    #[must_use]
    pub fn eq_prim(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| *a.borrow() == *b.borrow())
    }
}

impl<T: NodeSerde> Multi<T> {
    /// Writes every child as a map element of `out`, in order.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write.
    pub fn serialize(
        &self,
        out: &mut ArrayWriter<'_>,
        ids: &PointerMap,
        registry: &SerdesRegistry,
    ) -> Result<(), SerializeError> {
        for handle in &self.items {
            let mut map = out.append_map()?;
            let sequence = ids.get(addr_of(handle), type_name::<T>())?;
            map.append_int("@i", sequence_to_int(sequence))?;
            handle.borrow().serialize_node(&mut map, ids, registry)?;
            map.close()?;
        }
        Ok(())
    }

    /// Reads a sequence of children from an array of node maps.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        let mut items = Vec::with_capacity(array.len());
        for element in array.iter() {
            let map = element.as_map()?;
            items.push(T::deserialize_node(&map, links, registry)?);
        }
        Ok(Self { items })
    }

    /// Recurses the link post-pass into every child.
    ///
    /// # Errors
    ///
    /// Propagates unresolved sequence numbers.
    pub fn resolve_links(&self, table: &LinkTable) -> Result<(), SchemaError> {
        for handle in &self.items {
            handle.borrow_mut().resolve_links(table)?;
        }
        Ok(())
    }
}

impl<T> Multi<T> {
    /// Writes every primitive child as a map element of `out`, with its
    /// `@i`, in order.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write.
    pub fn serialize_prim(
        &self,
        out: &mut ArrayWriter<'_>,
        ids: &PointerMap,
        ser: impl Fn(&T, &mut MapWriter<'_>) -> Result<(), CodecError>,
    ) -> Result<(), SerializeError> {
        for handle in &self.items {
            let mut map = out.append_map()?;
            let sequence = ids.get(addr_of(handle), type_name::<T>())?;
            map.append_int("@i", sequence_to_int(sequence))?;
            ser(&handle.borrow(), &mut map)?;
            map.close()?;
        }
        Ok(())
    }

    /// Reads a sequence of primitive children, registering each `@i`.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize_prim<F>(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        des: F,
    ) -> Result<Self, DeserializeError>
    where
        T: 'static,
        F: Fn(&MapReader<'_>) -> Result<T, SchemaError>,
    {
        let mut items = Vec::with_capacity(array.len());
        for element in array.iter() {
            let map = element.as_map()?;
            let handle = node_ref(des(&map)?);
            links.register(&map, &handle)?;
            items.push(handle);
        }
        Ok(Self { items })
    }
}

impl<T> Clone for Multi<T> {
    /// Shallow clone: the copy shares all child handles.
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// List / NonEmptyList
// ---------------------------------------------------------------------------

/// Owning edge holding zero or more children in order. Always
/// well-formed at the edge itself.
#[derive(Debug)]
pub struct List<T> {
    items: Multi<T>,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Multi::new(),
        }
    }
}

impl<T> Deref for List<T> {
    type Target = Multi<T>;

    fn deref(&self) -> &Multi<T> {
        &self.items
    }
}

impl<T> DerefMut for List<T> {
    fn deref_mut(&mut self) -> &mut Multi<T> {
        &mut self.items
    }
}

impl<T: Completable> List<T> {
    /// Recurses into every child; an empty list is fine.
    ///
    /// # Errors
    ///
    /// Propagates violations from the children.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        _owner: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        self.items.check_complete(map)
    }
}

impl<T> List<T> {
    /// A list of primitives is always complete.
    ///
    /// # Errors
    ///
    /// Never fails; present for call-site uniformity.
    pub fn check_complete_prim(
        &self,
        _map: &PointerMap,
        _owner: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        Ok(())
    }
}

impl<T: TreeNode> List<T> {
    /// Recursively clones every child.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            items: self.items.deep_clone(),
        }
    }
}

impl<T: Clone> List<T> {
    /// Clones every primitive child into fresh handles.
    #[must_use]
    pub fn deep_clone_prim(&self) -> Self {
        Self {
            items: self.items.deep_clone_prim(),
        }
    }
}

impl<T: NodeSerde> List<T> {
    /// Reads a list edge from an array of node maps.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            items: Multi::deserialize(array, links, registry)?,
        })
    }
}

impl<T: 'static> List<T> {
    /// Reads a list of primitive children, registering each `@i`.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize_prim<F>(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        des: F,
    ) -> Result<Self, DeserializeError>
    where
        F: Fn(&MapReader<'_>) -> Result<T, SchemaError>,
    {
        Ok(Self {
            items: Multi::deserialize_prim(array, links, des)?,
        })
    }
}

impl<T> Clone for List<T> {
    /// Shallow clone: the copy shares all child handles.
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// Owning edge holding one or more children in order. Well-formed iff
/// non-empty.
#[derive(Debug)]
pub struct NonEmptyList<T> {
    items: Multi<T>,
}

impl<T> Default for NonEmptyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NonEmptyList<T> {
    /// Creates an empty list (not yet well-formed).
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Multi::new(),
        }
    }
}

impl<T> Deref for NonEmptyList<T> {
    type Target = Multi<T>;

    fn deref(&self) -> &Multi<T> {
        &self.items
    }
}

impl<T> DerefMut for NonEmptyList<T> {
    fn deref_mut(&mut self) -> &mut Multi<T> {
        &mut self.items
    }
}

impl<T: Completable> NonEmptyList<T> {
    /// Requires at least one child and recurses into all of them.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::EmptyList`] naming `owner.field`
    /// when empty.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        if self.items.is_empty() {
            return Err(NotWellFormed::EmptyList {
                type_name: owner,
                field,
            });
        }
        self.items.check_complete(map)
    }
}

impl<T> NonEmptyList<T> {
    /// Requires at least one primitive child.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::EmptyList`] when empty.
    pub fn check_complete_prim(
        &self,
        _map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        if self.items.is_empty() {
            return Err(NotWellFormed::EmptyList {
                type_name: owner,
                field,
            });
        }
        Ok(())
    }
}

impl<T: TreeNode> NonEmptyList<T> {
    /// Recursively clones every child.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            items: self.items.deep_clone(),
        }
    }
}

impl<T: Clone> NonEmptyList<T> {
    /// Clones every primitive child into fresh handles.
    #[must_use]
    pub fn deep_clone_prim(&self) -> Self {
        Self {
            items: self.items.deep_clone_prim(),
        }
    }
}

impl<T: NodeSerde> NonEmptyList<T> {
    /// Reads an at-least-one list edge from an array of node maps.
    /// Emptiness is a validation failure, not a decode failure.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        registry: &SerdesRegistry,
    ) -> Result<Self, DeserializeError> {
        Ok(Self {
            items: Multi::deserialize(array, links, registry)?,
        })
    }
}

impl<T: 'static> NonEmptyList<T> {
    /// Reads an at-least-one list of primitive children, registering
    /// each `@i`.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize_prim<F>(
        array: &ArrayReader<'_>,
        links: &mut LinkResolver,
        des: F,
    ) -> Result<Self, DeserializeError>
    where
        F: Fn(&MapReader<'_>) -> Result<T, SchemaError>,
    {
        Ok(Self {
            items: Multi::deserialize_prim(array, links, des)?,
        })
    }
}

impl<T> Clone for NonEmptyList<T> {
    /// Shallow clone: the copy shares all child handles.
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Link / OptLink
// ---------------------------------------------------------------------------

/// Internal state of a link edge.
#[derive(Debug)]
enum LinkState<T> {
    /// Not populated.
    Empty,
    /// Bound to a node owned elsewhere in the tree.
    Bound(Weak<std::cell::RefCell<T>>),
    /// Deserialized sequence number awaiting the resolve pass.
    Pending(u64),
}

impl<T> Clone for LinkState<T> {
    fn clone(&self) -> Self {
        match self {
            LinkState::Empty => LinkState::Empty,
            LinkState::Bound(weak) => LinkState::Bound(weak.clone()),
            LinkState::Pending(sequence) => LinkState::Pending(*sequence),
        }
    }
}

impl<T> LinkState<T> {
    fn get(&self) -> Option<NodeRef<T>> {
        match self {
            LinkState::Bound(weak) => weak.upgrade(),
            _ => None,
        }
    }

    fn identity_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LinkState::Empty, LinkState::Empty) => true,
            (LinkState::Bound(a), LinkState::Bound(b)) => Weak::ptr_eq(a, b),
            (LinkState::Pending(a), LinkState::Pending(b)) => a == b,
            _ => false,
        }
    }

    fn check(
        &self,
        map: &PointerMap,
        required: bool,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        match self {
            LinkState::Empty => {
                if required {
                    Err(NotWellFormed::MissingLink {
                        type_name: owner,
                        field,
                    })
                } else {
                    Ok(())
                }
            }
            LinkState::Pending(_) => Err(NotWellFormed::DanglingLink {
                type_name: owner,
                field,
            }),
            LinkState::Bound(weak) => {
                let target = weak.upgrade().ok_or(NotWellFormed::DanglingLink {
                    type_name: owner,
                    field,
                })?;
                if map.sequence(addr_of(&target)).is_none() {
                    return Err(NotWellFormed::DanglingLink {
                        type_name: owner,
                        field,
                    });
                }
                Ok(())
            }
        }
    }

    fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
        required: bool,
    ) -> Result<(), SerializeError> {
        match self {
            LinkState::Empty | LinkState::Pending(_) => {
                if required {
                    return Err(NotWellFormed::EmptyEdge {
                        type_name: type_name::<T>(),
                    }
                    .into());
                }
                map.append_null("@l")?;
                Ok(())
            }
            LinkState::Bound(weak) => {
                let target = weak.upgrade().ok_or(NotWellFormed::EmptyEdge {
                    type_name: type_name::<T>(),
                })?;
                let sequence = ids.get(addr_of(&target), type_name::<T>())?;
                map.append_int("@l", sequence_to_int(sequence))?;
                Ok(())
            }
        }
    }

    fn deserialize(map: &MapReader<'_>) -> Result<Self, DeserializeError> {
        let value = map.at("@l")?;
        if value.is_null() {
            return Ok(LinkState::Empty);
        }
        let raw = value.as_int()?;
        let sequence = u64::try_from(raw)
            .map_err(|_| SchemaError::Invalid(format!("negative link sequence {raw}")))?;
        Ok(LinkState::Pending(sequence))
    }

    fn resolve(&mut self, table: &LinkTable) -> Result<(), SchemaError>
    where
        T: 'static,
    {
        if let LinkState::Pending(sequence) = self {
            let target = table.lookup::<T>(*sequence)?;
            *self = LinkState::Bound(Rc::downgrade(&target));
        }
        Ok(())
    }
}

/// Non-owning, required reference to a node owned elsewhere in the same
/// tree. Well-formed iff populated and the target is reachable from the
/// root through owning edges.
#[derive(Debug)]
pub struct Link<T> {
    state: LinkState<T>,
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Link<T> {
    /// Creates an unpopulated link (not yet well-formed).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            state: LinkState::Empty,
        }
    }

    /// Creates a link targeting an existing node.
    #[must_use]
    pub fn to(target: &NodeRef<T>) -> Self {
        Self {
            state: LinkState::Bound(Rc::downgrade(target)),
        }
    }

    /// Retargets the link.
    pub fn bind(&mut self, target: &NodeRef<T>) {
        self.state = LinkState::Bound(Rc::downgrade(target));
    }

    /// Whether the link is unpopulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, LinkState::Empty)
    }

    /// Upgrades to the target handle, when bound and alive.
    #[must_use]
    pub fn get(&self) -> Option<NodeRef<T>> {
        self.state.get()
    }

    /// Identity equality with another link.
    #[must_use]
    pub fn identity_eq(&self, other: &Self) -> bool {
        self.state.identity_eq(&other.state)
    }

    /// Links are not followed by the reachability pass.
    ///
    /// # Errors
    ///
    /// Never fails; present for call-site uniformity.
    pub fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }

    /// Requires a populated link whose target is owned by this tree.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::MissingLink`] or
    /// [`NotWellFormed::DanglingLink`] naming `owner.field`.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        self.state.check(map, true, owner, field)
    }

    /// Writes `{"@l": sequence}` into `map`.
    ///
    /// # Errors
    ///
    /// Fails when unbound or when the target is not in `ids`.
    pub fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
    ) -> Result<(), SerializeError> {
        self.state.serialize(map, ids, true)
    }

    /// Reads a link value, deferring resolution to the post-pass.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(map: &MapReader<'_>) -> Result<Self, DeserializeError> {
        Ok(Self {
            state: LinkState::deserialize(map)?,
        })
    }

    /// Marks the link as pending resolution of `sequence`.
    pub fn defer(&mut self, sequence: u64) {
        self.state = LinkState::Pending(sequence);
    }
}

impl<T: 'static> Link<T> {
    /// Binds a pending link through the sequence table.
    ///
    /// # Errors
    ///
    /// Fails when the sequence number is unknown or of the wrong type.
    pub fn resolve(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.state.resolve(table)
    }
}

impl<T> Clone for Link<T> {
    /// Shallow clone: the copy references the same target.
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// Non-owning, optional reference to a node owned elsewhere in the same
/// tree. Well-formed when empty; a populated target must be reachable.
#[derive(Debug)]
pub struct OptLink<T> {
    state: LinkState<T>,
}

impl<T> Default for OptLink<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> OptLink<T> {
    /// Creates an unpopulated link.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            state: LinkState::Empty,
        }
    }

    /// Creates a link targeting an existing node.
    #[must_use]
    pub fn to(target: &NodeRef<T>) -> Self {
        Self {
            state: LinkState::Bound(Rc::downgrade(target)),
        }
    }

    /// Retargets the link.
    pub fn bind(&mut self, target: &NodeRef<T>) {
        self.state = LinkState::Bound(Rc::downgrade(target));
    }

    /// Empties the link.
    pub fn clear(&mut self) {
        self.state = LinkState::Empty;
    }

    /// Whether the link is unpopulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, LinkState::Empty)
    }

    /// Upgrades to the target handle, when bound and alive.
    #[must_use]
    pub fn get(&self) -> Option<NodeRef<T>> {
        self.state.get()
    }

    /// Identity equality with another link.
    #[must_use]
    pub fn identity_eq(&self, other: &Self) -> bool {
        self.state.identity_eq(&other.state)
    }

    /// Links are not followed by the reachability pass.
    ///
    /// # Errors
    ///
    /// Never fails; present for call-site uniformity.
    pub fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }

    /// When populated, the target must be owned by this tree.
    ///
    /// # Errors
    ///
    /// Fails with [`NotWellFormed::DanglingLink`] naming `owner.field`.
    pub fn check_complete(
        &self,
        map: &PointerMap,
        owner: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        self.state.check(map, false, owner, field)
    }

    /// Writes `{"@l": sequence}` or `{"@l": null}` into `map`.
    ///
    /// # Errors
    ///
    /// Fails when a bound target is not in `ids`.
    pub fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        ids: &PointerMap,
    ) -> Result<(), SerializeError> {
        self.state.serialize(map, ids, false)
    }

    /// Reads a link value, deferring resolution to the post-pass.
    ///
    /// # Errors
    ///
    /// Fails when the payload does not match the schema.
    pub fn deserialize(map: &MapReader<'_>) -> Result<Self, DeserializeError> {
        Ok(Self {
            state: LinkState::deserialize(map)?,
        })
    }

    /// Marks the link as pending resolution of `sequence`.
    pub fn defer(&mut self, sequence: u64) {
        self.state = LinkState::Pending(sequence);
    }
}

impl<T: 'static> OptLink<T> {
    /// Binds a pending link through the sequence table.
    ///
    /// # Errors
    ///
    /// Fails when the sequence number is unknown or of the wrong type.
    pub fn resolve(&mut self, table: &LinkTable) -> Result<(), SchemaError> {
        self.state.resolve(table)
    }
}

impl<T> Clone for OptLink<T> {
    /// Shallow clone: the copy references the same target.
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn signed_indices_resolve_like_sequences() {
        assert_eq!(resolve_index(3, 0), Some(0));
        assert_eq!(resolve_index(3, 2), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, -3), Some(0));
        assert_eq!(resolve_index(3, -4), None);
        assert_eq!(resolve_insert_index(3, 10), 3);
        assert_eq!(resolve_insert_index(3, -1), 2);
        assert_eq!(resolve_insert_index(3, -9), 0);
    }

    #[test]
    fn multi_indexing_and_chaining() {
        let mut items: Multi<i32> = Multi::new();
        items.add(1).add(2).add(3);
        assert_eq!(items.len(), 3);
        assert_eq!(*items.get(-1).unwrap(), 3);
        items.insert(-1, 9);
        assert_eq!(*items.get(1).unwrap(), 2);
        assert_eq!(*items.get(2).unwrap(), 9);
        let removed = items.remove(0).unwrap();
        assert_eq!(*removed.borrow(), 1);
        assert!(items.remove(17).is_none());
    }

    #[test]
    fn exactly_tracks_population() {
        let mut edge: Exactly<i32> = Exactly::empty();
        assert!(edge.is_empty());
        assert!(matches!(
            edge.require().unwrap_err(),
            NotWellFormed::EmptyEdge { .. }
        ));
        edge.set(4);
        assert_eq!(*edge.require().unwrap(), 4);
    }

    #[test]
    fn prim_edges_register_identity_once() {
        let mut map = PointerMap::new();
        let shared = node_ref('x');
        let a = Exactly::new(shared.clone());
        let b = Maybe::new(shared);
        a.find_reachable_prim(&mut map).unwrap();
        let err = b.find_reachable_prim(&mut map).unwrap_err();
        assert!(matches!(err, NotWellFormed::DuplicateNode { .. }));
    }

    #[test]
    fn link_identity_semantics() {
        let target = node_ref(1_i32);
        let other = node_ref(1_i32);
        let a = Link::to(&target);
        let b = Link::to(&target);
        let c = Link::to(&other);
        assert!(a.identity_eq(&b));
        assert!(!a.identity_eq(&c));
        assert!(!a.identity_eq(&Link::empty()));
    }

    #[test]
    fn dangling_links_fail_completeness() {
        let mut ids = PointerMap::new();
        let owned = node_ref(1_i32);
        ids.add(addr_of(&owned), "i32").unwrap();

        let good = Link::to(&owned);
        good.check_complete(&ids, "Owner", "field").unwrap();

        let stray = node_ref(2_i32);
        let bad = Link::to(&stray);
        assert!(matches!(
            bad.check_complete(&ids, "Owner", "field").unwrap_err(),
            NotWellFormed::DanglingLink { type_name: "Owner", field: "field" }
        ));

        assert!(matches!(
            Link::<i32>::empty()
                .check_complete(&ids, "Owner", "field")
                .unwrap_err(),
            NotWellFormed::MissingLink { .. }
        ));

        OptLink::<i32>::empty()
            .check_complete(&ids, "Owner", "field")
            .unwrap();
    }

    #[test]
    fn dead_weak_links_are_dangling() {
        let mut ids = PointerMap::new();
        let link = {
            let target = node_ref(5_i32);
            ids.add(addr_of(&target), "i32").unwrap();
            Link::to(&target)
        };
        // Target dropped; the weak handle no longer upgrades.
        assert!(matches!(
            link.check_complete(&ids, "Owner", "field").unwrap_err(),
            NotWellFormed::DanglingLink { .. }
        ));
    }
}
