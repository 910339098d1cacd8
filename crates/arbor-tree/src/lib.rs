// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-tree: the runtime library arbor-generated trees are built on.
//!
//! Generated modules depend on exactly three things from here:
//!
//! - the edge value types ([`edge`]) that connect nodes — four owning
//!   kinds and two link kinds over shared node handles;
//! - the well-formedness machinery ([`node`]): a two-pass walk that
//!   checks ownership uniqueness, required edges, and link
//!   reachability;
//! - typed per-node side data ([`annotation`]) with a pluggable
//!   serializer registry, and the tree-level CBOR drivers ([`serdes`]).
//!
//! The codec itself is re-exported as [`cbor`] so generated code and
//! primitive serializers need only this crate.
//!
//! Trees are single-threaded values: nodes are not synchronized, and a
//! tree may be shared across threads for reading only while nothing
//! mutates it. The annotation registry is the one process-wide piece of
//! state; it is append-only and read-locked after startup.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

pub mod annotation;
pub mod edge;
pub mod error;
pub mod node;
pub mod serdes;

pub use arbor_cbor as cbor;

pub use annotation::{register_annotation, Annotations, SerdesRegistry};
pub use edge::{Exactly, Link, List, Maybe, Multi, NonEmptyList, OptLink};
pub use error::{DeserializeError, MissingAnnotation, NotWellFormed, SerializeError};
pub use node::{
    addr_of, node_ref, Completable, LinkResolver, LinkTable, NodeRef, NodeSerde, PointerMap,
    TreeNode,
};
pub use serdes::{deserialize_tree, deserialize_tree_with, serialize_tree, serialize_tree_with};
