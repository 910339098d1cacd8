// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-demo: the filesystem example tree.
//!
//! [`directory`] and [`trivial`] are checked-in arbor-gen output for
//! the schemas under `schema/`; [`primitives`] is the user-side module
//! those schemas declare. Regenerate with:
//!
//! ```text
//! arbor-gen schema/directory.tree src/directory.rs
//! arbor-gen schema/trivial.tree src/trivial.rs
//! ```
//!
//! The integration tests under `tests/` drive the generated model end
//! to end: construction, validation, round-trips, and dumps.

#![forbid(unsafe_code)]

pub mod directory;
pub mod primitives;
pub mod trivial;
