// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! User-side primitive types for the directory tree.
//!
//! The schema treats these as opaque external types; the generated
//! module only needs the capability functions declared in the schema's
//! directives — `initialize`, `serialize`, and `deserialize` — plus
//! `Clone`, `PartialEq`, `Debug`, and `Display` on each type.

use std::fmt;

use arbor_tree::cbor::{CodecError, MapReader, MapWriter, SchemaError};

/// A drive letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letter(pub char);

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string value; file names and contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Str(pub String);

impl Str {
    /// Builds a string value.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Source position carried as an annotation and shown inline by the
/// debug dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Capability contract the generated code exercises through the free
/// functions below.
pub trait Primitive: Sized {
    /// The value a defaulted constructor argument gets.
    fn initialize() -> Self;

    /// Writes this value as map entries.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write.
    fn write(&self, map: &mut MapWriter<'_>) -> Result<(), CodecError>;

    /// Rebuilds a value from its map entries.
    ///
    /// # Errors
    ///
    /// Fails when the payload is missing or malformed.
    fn read(map: &MapReader<'_>) -> Result<Self, SchemaError>;
}

impl Primitive for Letter {
    // The first drive asked for gets to be A.
    fn initialize() -> Self {
        Letter('A')
    }

    fn write(&self, map: &mut MapWriter<'_>) -> Result<(), CodecError> {
        map.append_string("letter", &self.0.to_string())
    }

    fn read(map: &MapReader<'_>) -> Result<Self, SchemaError> {
        let text = map.at("letter")?.as_string()?;
        text.chars()
            .next()
            .map(Letter)
            .ok_or_else(|| SchemaError::Invalid("empty drive letter".to_owned()))
    }
}

impl Primitive for Str {
    fn initialize() -> Self {
        Str(String::new())
    }

    fn write(&self, map: &mut MapWriter<'_>) -> Result<(), CodecError> {
        map.append_string("text", &self.0)
    }

    fn read(map: &MapReader<'_>) -> Result<Self, SchemaError> {
        Ok(Str(map.at("text")?.as_string()?))
    }
}

/// The `initialize_function` the schema declares.
pub fn initialize<T: Primitive>() -> T {
    T::initialize()
}

/// The serialize half of the schema's `serdes_functions`.
///
/// # Errors
///
/// Fails when the codec rejects a write.
pub fn serialize<T: Primitive>(value: &T, map: &mut MapWriter<'_>) -> Result<(), CodecError> {
    value.write(map)
}

/// The deserialize half of the schema's `serdes_functions`.
///
/// # Errors
///
/// Fails when the payload is missing or malformed.
pub fn deserialize<T: Primitive>(map: &MapReader<'_>) -> Result<T, SchemaError> {
    T::read(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_tree::cbor::{Reader, Writer};

    #[test]
    fn defaults_follow_the_schema_contract() {
        assert_eq!(initialize::<Letter>(), Letter('A'));
        assert_eq!(initialize::<Str>(), Str(String::new()));
    }

    #[test]
    fn primitives_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut map = Writer::new(&mut buf).root().unwrap();
            serialize(&Str::new("hello"), &mut map).unwrap();
            map.close().unwrap();
        }
        let reader = Reader::new(&buf).unwrap();
        let value: Str = deserialize(&reader.as_map().unwrap()).unwrap();
        assert_eq!(value, Str::new("hello"));
    }

    #[test]
    fn display_forms_used_by_the_dump() {
        assert_eq!(Letter('A').to_string(), "A");
        assert_eq!(Str::new("y").to_string(), "\"y\"");
        assert_eq!(SourceLocation { line: 3, column: 9 }.to_string(), "3:9");
    }
}
