// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-cbor: the self-describing binary codec used by arbor trees.
//!
//! This is a deliberately small subset of RFC 7049, shaped for the
//! schema-driven tree encoding rather than general-purpose CBOR:
//!
//! - Values: null, booleans, signed 64-bit integers, double-precision
//!   floats, byte strings, UTF-8 strings, arrays, and maps with string
//!   keys.
//! - The reader accepts definite and indefinite lengths, skips semantic
//!   tags, and validates the whole document structurally up front.
//! - The writer emits a single root map, indefinite-length containers,
//!   minimal-width integer heads, and double-precision floats only.
//!
//! # Determinism
//!
//! Map keys are written in the order the caller appends them; the codec
//! never re-sorts. Given the same append sequence the output bytes are
//! identical across runs and platforms.

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

mod error;
mod read;
mod write;

pub use error::{CodecError, SchemaError};
pub use read::{ArrayReader, Kind, MapReader, Reader};
pub use write::{ArrayWriter, MapWriter, Writer};
