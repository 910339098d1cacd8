// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-gen: the typed tree code generator.
//!
//! A schema describes node kinds, inheritance between them, and their
//! typed edges; the generator compiles it into a target-language module
//! implementing the full node model — construction, traversal,
//! validation, copy/clone, equality, debug dump, and self-describing
//! CBOR (de)serialization against the `arbor-tree` runtime.
//!
//! The pipeline is parse → analyze → emit: [`parser`] turns schema text
//! into its unresolved form, [`analyze`] resolves references and
//! validates, and [`emit`] renders the resolved [`spec::Specification`]
//! as Rust (primary, with serdes) or Python (secondary, without).

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

pub mod analyze;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod spec;

pub use error::SchemaError;
pub use spec::Specification;

/// Compiles schema text into a resolved specification, stamping the
/// schema's BLAKE3 digest.
///
/// # Errors
///
/// Fails with [`SchemaError`] on any lexical, syntactic, or semantic
/// violation; `file` is used in diagnostics only.
pub fn compile(source: &str, file: &str) -> Result<Specification, SchemaError> {
    let parsed = parser::parse(source, file)?;
    let mut spec = analyze::analyze(parsed)?;
    spec.schema_hash = blake3::hash(source.as_bytes()).to_hex().to_string();
    Ok(spec)
}
