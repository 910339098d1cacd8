// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for the tree runtime.

use arbor_cbor::{CodecError, SchemaError};
use thiserror::Error;

/// A tree violated one of the well-formedness invariants: ownership
/// uniqueness, required edges populated, non-empty lists non-empty,
/// links resolving inside the tree, and no error-marker nodes.
///
/// [`Completable::is_well_formed`](crate::node::Completable::is_well_formed)
/// is the only place this error is converted into a boolean; every
/// other path propagates it.
#[derive(Debug, Error)]
pub enum NotWellFormed {
    /// The same node is owned through more than one edge.
    #[error("duplicate node of type {type_name} in tree")]
    DuplicateNode {
        /// Type of the duplicated node.
        type_name: &'static str,
    },

    /// A required single-child edge is empty.
    #[error("required edge {field} of {type_name} is empty")]
    MissingChild {
        /// Type that declares the edge.
        type_name: &'static str,
        /// Field name of the edge.
        field: &'static str,
    },

    /// An at-least-one list edge owns no nodes.
    #[error("edge {field} of {type_name} must own at least one node")]
    EmptyList {
        /// Type that declares the edge.
        type_name: &'static str,
        /// Field name of the edge.
        field: &'static str,
    },

    /// A required link edge is not populated.
    #[error("link {field} of {type_name} is not populated")]
    MissingLink {
        /// Type that declares the link.
        type_name: &'static str,
        /// Field name of the link.
        field: &'static str,
    },

    /// A populated link does not target a node owned by this tree.
    #[error("link {field} of {type_name} does not target a node owned by this tree")]
    DanglingLink {
        /// Type that declares the link.
        type_name: &'static str,
        /// Field name of the link.
        field: &'static str,
    },

    /// A link target was looked up in the reachability map and missed.
    #[error("link to a node of type {type_name} that is not owned by this tree")]
    UnknownTarget {
        /// Type of the link target.
        type_name: &'static str,
    },

    /// An operation that needs a populated edge found it empty.
    #[error("empty edge of type {type_name}")]
    EmptyEdge {
        /// Child type of the edge.
        type_name: &'static str,
    },

    /// A node marking a recovered parse error is present in the tree.
    #[error("error marker {type_name} present in tree")]
    ErrorMarker {
        /// Type of the error-marker node.
        type_name: &'static str,
    },
}

/// An annotation lookup failed because the node carries no annotation
/// of the requested type.
#[derive(Debug, Error)]
#[error("node has no annotation of type {type_name}")]
pub struct MissingAnnotation {
    /// The requested annotation type.
    pub type_name: &'static str,
}

/// Failure while serializing a tree: either the tree is not well-formed
/// or the codec could not write.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The tree failed validation.
    #[error(transparent)]
    NotWellFormed(#[from] NotWellFormed),

    /// The codec failed to write.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure while deserializing a tree: either the payload does not
/// match the schema or the bytes are not decodable CBOR.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// The payload is structurally valid CBOR but does not match the
    /// schema that produced this tree type.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The bytes are not decodable within the supported CBOR subset.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
