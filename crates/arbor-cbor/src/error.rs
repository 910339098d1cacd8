// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for the CBOR subset codec.

use std::io;

use thiserror::Error;

/// Errors raised while writing CBOR or while structurally decoding it.
///
/// A [`CodecError`] means the byte stream itself is unusable: it is
/// truncated, uses a feature outside the supported subset, or the sink
/// rejected a write. Kind mismatches on structurally valid data are
/// reported as [`SchemaError`] instead.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The byte sink failed while writing.
    #[error("I/O error while writing CBOR: {0}")]
    Io(#[from] io::Error),

    /// Input ended in the middle of an item.
    #[error("truncated CBOR input: needed {needed} more byte(s) at offset {offset}")]
    Truncated {
        /// Offset at which more input was expected.
        offset: usize,
        /// Minimum number of missing bytes.
        needed: usize,
    },

    /// Extra bytes follow the root item.
    #[error("{remaining} trailing byte(s) after the CBOR value at offset {offset}")]
    TrailingBytes {
        /// Offset of the first trailing byte.
        offset: usize,
        /// Number of trailing bytes.
        remaining: usize,
    },

    /// The input uses a CBOR feature outside the supported subset
    /// (undefined, half/single-precision floats, simple values).
    #[error("unsupported CBOR item 0x{byte:02X} at offset {offset}: {reason}")]
    Unsupported {
        /// The offending initial byte.
        byte: u8,
        /// Offset of the offending byte.
        offset: usize,
        /// What the byte encodes.
        reason: &'static str,
    },

    /// The input violates the CBOR framing rules (stray break codes,
    /// reserved encodings, mismatched chunk types, excessive nesting).
    #[error("malformed CBOR at offset {offset}: {reason}")]
    Malformed {
        /// Offset of the violation.
        offset: usize,
        /// Description of the violation.
        reason: &'static str,
    },

    /// An integer does not fit in a signed 64-bit value.
    #[error("integer at offset {offset} does not fit in a signed 64-bit value")]
    IntegerOverflow {
        /// Offset of the integer's initial byte.
        offset: usize,
    },

    /// A text string (or text chunk) is not valid UTF-8.
    #[error("text string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the string's initial byte.
        offset: usize,
    },
}

/// Errors raised when structurally valid CBOR does not match what the
/// caller's schema expects: a typed accessor applied to the wrong kind,
/// a missing map key, or a payload that names an unknown node type or
/// link target.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A typed accessor was applied to an item of a different kind.
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        /// Kind required by the accessor.
        expected: &'static str,
        /// Kind actually present.
        found: &'static str,
    },

    /// A map lookup failed.
    #[error("map has no entry for key {key:?}")]
    MissingKey {
        /// The key that was looked up.
        key: String,
    },

    /// An array index was out of bounds.
    #[error("array index {index} out of bounds (length {length})")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The array length.
        length: usize,
    },

    /// A serialized node names a type the schema does not know.
    #[error("unexpected node type {found:?} in serialized tree")]
    UnknownNodeType {
        /// The `@t` value found in the payload.
        found: String,
    },

    /// A serialized link references a sequence number that no node in
    /// the payload carries.
    #[error("link references sequence number {sequence}, which no node in the tree carries")]
    UnknownSequence {
        /// The dangling `@l` value.
        sequence: u64,
    },

    /// A payload value is structurally present but semantically invalid
    /// for the schema (reported by user deserializers).
    #[error("{0}")]
    Invalid(String),

    /// Structural damage discovered after construction-time validation.
    /// Unreachable for readers produced by [`crate::Reader::new`].
    #[error("corrupt CBOR slice: {0}")]
    Corrupt(#[from] CodecError),
}
