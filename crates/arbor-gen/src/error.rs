// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema compilation errors.

use thiserror::Error;

/// Everything that can go wrong between schema text and a resolved
/// [`Specification`](crate::spec::Specification).
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Lexical or syntactic failure, with the source position.
    #[error("{file}:{line}: {message}")]
    Parse {
        /// Schema file name.
        file: String,
        /// 1-based line number.
        line: u32,
        /// What went wrong.
        message: String,
    },

    /// A single-occurrence directive appeared twice.
    #[error("{file}:{line}: duplicate {directive} declaration")]
    DuplicateDirective {
        /// Schema file name.
        file: String,
        /// 1-based line number of the second occurrence.
        line: u32,
        /// The repeated directive.
        directive: &'static str,
    },

    /// Two node blocks share a name.
    #[error("duplicate node name {name}")]
    DuplicateNode {
        /// The repeated node name.
        name: String,
    },

    /// A field references a node that is not declared anywhere.
    #[error("use of undefined node {name}")]
    UndefinedNode {
        /// The unresolved reference.
        name: String,
    },

    /// A field name collides with another field of the same node,
    /// including inherited ones.
    #[error("duplicate field name {field} in node {node}")]
    DuplicateField {
        /// The node (snake_case) declaring the collision.
        node: String,
        /// The colliding field name.
        field: String,
    },

    /// A node-typed field was declared without an edge kind.
    #[error("field {field} of node {node} references a node and must use an edge kind")]
    BareNodeReference {
        /// The declaring node.
        node: String,
        /// The offending field.
        field: String,
    },

    /// A `reorder` names a field the node does not have.
    #[error("unknown field {field} in field order of node {node}")]
    UnknownOrderField {
        /// The node carrying the `reorder`.
        node: String,
        /// The unknown name.
        field: String,
    },

    /// The schema never declared its initialize function.
    #[error("initialization function not specified")]
    MissingInitializeFunction,
}
