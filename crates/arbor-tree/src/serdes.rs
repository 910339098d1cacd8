// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tree-level serialization drivers.
//!
//! A serialized tree is a single top-level CBOR map: the root node's
//! map. Every node map carries `@t` (leaf type name) and `@i` (its
//! sequence number from the reachability pass); owning edges nest child
//! maps (or arrays of maps) under their field names; links encode as
//! `{"@l": <sequence>}`. Annotations ride along under braced keys.
//!
//! Serialization validates the tree first — the reachability pass
//! produces the sequence numbers links need, and refusing ill-formed
//! trees keeps the round-trip property total. Deserialization rebuilds
//! the nodes, then binds deferred links in a post-pass once every
//! sequence number is known.

use arbor_cbor::{Reader, Writer};

use crate::annotation::{with_global_registry, SerdesRegistry};
use crate::edge::Exactly;
use crate::error::{DeserializeError, SerializeError};
use crate::node::{LinkResolver, NodeSerde, PointerMap, TreeNode};

/// Serializes the tree held by `root` using the process-wide
/// annotation registry.
///
/// # Errors
///
/// Fails with [`SerializeError::NotWellFormed`] when the tree does not
/// validate, or [`SerializeError::Codec`] when writing fails.
pub fn serialize_tree<T>(root: &Exactly<T>) -> Result<Vec<u8>, SerializeError>
where
    T: TreeNode + NodeSerde,
{
    with_global_registry(|registry| serialize_tree_with(root, registry))
}

/// Serializes the tree held by `root` against an explicit annotation
/// registry.
///
/// # Errors
///
/// Fails with [`SerializeError::NotWellFormed`] when the tree does not
/// validate, or [`SerializeError::Codec`] when writing fails.
pub fn serialize_tree_with<T>(
    root: &Exactly<T>,
    registry: &SerdesRegistry,
) -> Result<Vec<u8>, SerializeError>
where
    T: TreeNode + NodeSerde,
{
    let mut ids = PointerMap::new();
    root.find_reachable(&mut ids)?;
    root.check_complete(&ids, std::any::type_name::<T>(), "root")?;

    let mut buf = Vec::new();
    let mut map = Writer::new(&mut buf).root()?;
    root.serialize(&mut map, &ids, registry)?;
    map.close()?;
    Ok(buf)
}

/// Deserializes a tree from `bytes` using the process-wide annotation
/// registry.
///
/// # Errors
///
/// Fails with [`DeserializeError::Codec`] on undecodable bytes or
/// [`DeserializeError::Schema`] when the payload does not match the
/// tree type.
pub fn deserialize_tree<T>(bytes: &[u8]) -> Result<Exactly<T>, DeserializeError>
where
    T: NodeSerde,
{
    with_global_registry(|registry| deserialize_tree_with(bytes, registry))
}

/// Deserializes a tree from `bytes` against an explicit annotation
/// registry.
///
/// # Errors
///
/// Fails with [`DeserializeError::Codec`] on undecodable bytes or
/// [`DeserializeError::Schema`] when the payload does not match the
/// tree type.
pub fn deserialize_tree_with<T>(
    bytes: &[u8],
    registry: &SerdesRegistry,
) -> Result<Exactly<T>, DeserializeError>
where
    T: NodeSerde,
{
    let reader = Reader::new(bytes)?;
    let map = reader.as_map()?;
    let mut links = LinkResolver::new();
    let root = T::deserialize_node(&map, &mut links, registry)?;
    let table = links.into_table();
    root.borrow_mut().resolve_links(&table)?;
    Ok(Exactly::new(root))
}
