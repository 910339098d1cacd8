// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validating CBOR reader.
//!
//! [`Reader`] wraps a borrowed byte slice holding exactly one CBOR item
//! and exposes it as a hierarchical view: kind predicates, typed
//! accessors, and sub-readers for array elements and map values.
//!
//! Construction performs a full structural walk of the input, so a
//! successfully built reader is known to be decodable end to end.
//! The walk rejects everything outside the supported subset: undefined,
//! half/single-precision floats, integers outside the signed 64-bit
//! range, reserved encodings, stray break codes, indefinite-length
//! strings with mismatched chunk types, and invalid UTF-8. Semantic
//! tags are skipped transparently.

use std::collections::BTreeMap;

use crate::error::{CodecError, SchemaError};

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INFO_INDEFINITE: u8 = 31;
const BREAK: u8 = 0xFF;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;
const SIMPLE_UNDEFINED: u8 = 23;
const SIMPLE_HALF: u8 = 25;
const SIMPLE_SINGLE: u8 = 26;
const SIMPLE_DOUBLE: u8 = 27;

/// Maximum container/tag nesting depth accepted by the structural walk.
/// Traversal is recursive, so the bound keeps hostile input from
/// exhausting the stack.
const MAX_NESTING: usize = 1024;

/// The kind of a CBOR item, after tag skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The null value.
    Null,
    /// A boolean.
    Bool,
    /// A signed 64-bit integer.
    Int,
    /// A double-precision float.
    Float,
    /// A UTF-8 text string.
    String,
    /// A byte string.
    Binary,
    /// An array of items.
    Array,
    /// A map from text keys to items.
    Map,
}

impl Kind {
    /// Human-readable name used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Int => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Binary => "byte string",
            Kind::Array => "array",
            Kind::Map => "map",
        }
    }
}

/// Decoded initial byte plus its argument.
#[derive(Debug, Clone, Copy)]
struct Head {
    /// Major type (top three bits).
    major: u8,
    /// Additional information (bottom five bits).
    info: u8,
    /// Decoded argument value (zero for indefinite lengths).
    arg: u64,
    /// Offset just past the head.
    end: usize,
}

fn read_be(data: &[u8], at: usize, len: usize) -> Result<u64, CodecError> {
    let end = at
        .checked_add(len)
        .ok_or(CodecError::Truncated { offset: at, needed: len })?;
    let bytes = data.get(at..end).ok_or(CodecError::Truncated {
        offset: data.len(),
        needed: end - data.len().min(end),
    })?;
    let mut value = 0u64;
    for b in bytes {
        value = (value << 8) | u64::from(*b);
    }
    Ok(value)
}

fn read_head(data: &[u8], at: usize) -> Result<Head, CodecError> {
    let byte = *data
        .get(at)
        .ok_or(CodecError::Truncated { offset: at, needed: 1 })?;
    let major = byte >> 5;
    let info = byte & 0x1F;
    let (arg, end) = match info {
        0..=23 => (u64::from(info), at + 1),
        24 => (read_be(data, at + 1, 1)?, at + 2),
        25 => (read_be(data, at + 1, 2)?, at + 3),
        26 => (read_be(data, at + 1, 4)?, at + 5),
        27 => (read_be(data, at + 1, 8)?, at + 9),
        INFO_INDEFINITE => (0, at + 1),
        _ => {
            return Err(CodecError::Malformed {
                offset: at,
                reason: "reserved additional-information encoding",
            })
        }
    };
    Ok(Head { major, info, arg, end })
}

fn arg_len(data: &[u8], head: Head, at: usize) -> Result<usize, CodecError> {
    let len = usize::try_from(head.arg)
        .map_err(|_| CodecError::IntegerOverflow { offset: at })?;
    let end = head
        .end
        .checked_add(len)
        .ok_or(CodecError::IntegerOverflow { offset: at })?;
    if end > data.len() {
        return Err(CodecError::Truncated {
            offset: data.len(),
            needed: end - data.len(),
        });
    }
    Ok(end)
}

/// Validates the string item whose head is at `at` and returns the
/// offset past it. Indefinite-length strings must be composed of
/// definite chunks of the same major type; text chunks must each be
/// valid UTF-8.
fn skip_string(data: &[u8], at: usize, head: Head) -> Result<usize, CodecError> {
    if head.info != INFO_INDEFINITE {
        let end = arg_len(data, head, at)?;
        if head.major == MAJOR_TEXT && std::str::from_utf8(&data[head.end..end]).is_err() {
            return Err(CodecError::InvalidUtf8 { offset: at });
        }
        return Ok(end);
    }
    let mut cursor = head.end;
    loop {
        let byte = *data
            .get(cursor)
            .ok_or(CodecError::Truncated { offset: cursor, needed: 1 })?;
        if byte == BREAK {
            return Ok(cursor + 1);
        }
        let chunk = read_head(data, cursor)?;
        if chunk.major != head.major || chunk.info == INFO_INDEFINITE {
            return Err(CodecError::Malformed {
                offset: cursor,
                reason: "indefinite-length string chunk has the wrong type",
            });
        }
        let end = arg_len(data, chunk, cursor)?;
        if chunk.major == MAJOR_TEXT && std::str::from_utf8(&data[chunk.end..end]).is_err() {
            return Err(CodecError::InvalidUtf8 { offset: cursor });
        }
        cursor = end;
    }
}

/// Validates the item at `at` and returns the offset just past it.
fn skip_item(data: &[u8], at: usize, depth: usize) -> Result<usize, CodecError> {
    if depth > MAX_NESTING {
        return Err(CodecError::Malformed {
            offset: at,
            reason: "nesting exceeds the supported depth",
        });
    }
    let head = read_head(data, at)?;
    match head.major {
        MAJOR_UNSIGNED => {
            if head.info == INFO_INDEFINITE {
                return Err(CodecError::Malformed {
                    offset: at,
                    reason: "indefinite-length integer",
                });
            }
            if head.arg > i64::MAX as u64 {
                return Err(CodecError::IntegerOverflow { offset: at });
            }
            Ok(head.end)
        }
        MAJOR_NEGATIVE => {
            if head.info == INFO_INDEFINITE {
                return Err(CodecError::Malformed {
                    offset: at,
                    reason: "indefinite-length integer",
                });
            }
            // -1 - arg must not underflow i64::MIN.
            if head.arg > i64::MAX as u64 {
                return Err(CodecError::IntegerOverflow { offset: at });
            }
            Ok(head.end)
        }
        MAJOR_BYTES | MAJOR_TEXT => skip_string(data, at, head),
        MAJOR_ARRAY => {
            let mut cursor = head.end;
            if head.info == INFO_INDEFINITE {
                loop {
                    let byte = *data
                        .get(cursor)
                        .ok_or(CodecError::Truncated { offset: cursor, needed: 1 })?;
                    if byte == BREAK {
                        return Ok(cursor + 1);
                    }
                    cursor = skip_item(data, cursor, depth + 1)?;
                }
            }
            for _ in 0..head.arg {
                cursor = skip_item(data, cursor, depth + 1)?;
            }
            Ok(cursor)
        }
        MAJOR_MAP => {
            let mut cursor = head.end;
            if head.info == INFO_INDEFINITE {
                loop {
                    let byte = *data
                        .get(cursor)
                        .ok_or(CodecError::Truncated { offset: cursor, needed: 1 })?;
                    if byte == BREAK {
                        return Ok(cursor + 1);
                    }
                    cursor = skip_item(data, cursor, depth + 1)?;
                    cursor = skip_item(data, cursor, depth + 1)?;
                }
            }
            for _ in 0..head.arg {
                cursor = skip_item(data, cursor, depth + 1)?;
                cursor = skip_item(data, cursor, depth + 1)?;
            }
            Ok(cursor)
        }
        MAJOR_TAG => {
            if head.info == INFO_INDEFINITE {
                return Err(CodecError::Malformed {
                    offset: at,
                    reason: "indefinite-length tag",
                });
            }
            skip_item(data, head.end, depth + 1)
        }
        _ => match head.info {
            SIMPLE_FALSE | SIMPLE_TRUE | SIMPLE_NULL => Ok(head.end),
            SIMPLE_DOUBLE => Ok(head.end),
            SIMPLE_UNDEFINED => Err(CodecError::Unsupported {
                byte: 0xF7,
                offset: at,
                reason: "undefined value",
            }),
            SIMPLE_HALF => Err(CodecError::Unsupported {
                byte: 0xF9,
                offset: at,
                reason: "half-precision float",
            }),
            SIMPLE_SINGLE => Err(CodecError::Unsupported {
                byte: 0xFA,
                offset: at,
                reason: "single-precision float",
            }),
            INFO_INDEFINITE => Err(CodecError::Malformed {
                offset: at,
                reason: "unexpected break code",
            }),
            _ => Err(CodecError::Unsupported {
                byte: (MAJOR_SIMPLE << 5) | head.info,
                offset: at,
                reason: "simple value",
            }),
        },
    }
}

/// A borrowed view over exactly one structurally validated CBOR item.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Builds a reader over `data`, which must hold exactly one CBOR
    /// item of the supported subset.
    ///
    /// # Errors
    ///
    /// Fails with [`CodecError`] when the input is truncated, carries
    /// trailing bytes, or uses a feature outside the subset.
    pub fn new(data: &'a [u8]) -> Result<Self, CodecError> {
        let end = skip_item(data, 0, 0)?;
        if end != data.len() {
            return Err(CodecError::TrailingBytes {
                offset: end,
                remaining: data.len() - end,
            });
        }
        Ok(Self { data })
    }

    /// Wraps an already validated sub-slice. Callers must only pass
    /// ranges produced by [`skip_item`] over validated data.
    fn sub(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw bytes of this item, including any leading tags.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Head of the content item, with leading semantic tags skipped.
    fn content(&self) -> Result<(Head, usize), CodecError> {
        let mut at = 0;
        loop {
            let head = read_head(self.data, at)?;
            if head.major == MAJOR_TAG {
                at = head.end;
            } else {
                return Ok((head, at));
            }
        }
    }

    fn kind_internal(&self) -> Result<Kind, CodecError> {
        let (head, at) = self.content()?;
        Ok(match head.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => Kind::Int,
            MAJOR_BYTES => Kind::Binary,
            MAJOR_TEXT => Kind::String,
            MAJOR_ARRAY => Kind::Array,
            MAJOR_MAP => Kind::Map,
            _ => match head.info {
                SIMPLE_FALSE | SIMPLE_TRUE => Kind::Bool,
                SIMPLE_NULL => Kind::Null,
                SIMPLE_DOUBLE => Kind::Float,
                _ => {
                    return Err(CodecError::Malformed {
                        offset: at,
                        reason: "unclassifiable item",
                    })
                }
            },
        })
    }

    /// The kind of this item.
    ///
    /// # Errors
    ///
    /// Only fails for readers not produced through [`Reader::new`].
    pub fn kind(&self) -> Result<Kind, SchemaError> {
        Ok(self.kind_internal()?)
    }

    fn expect(&self, expected: Kind) -> Result<(Head, usize), SchemaError> {
        let found = self.kind_internal()?;
        if found != expected {
            return Err(SchemaError::KindMismatch {
                expected: expected.name(),
                found: found.name(),
            });
        }
        Ok(self.content()?)
    }

    /// Whether this item is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Null))
    }

    /// Whether this item is a boolean.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Bool))
    }

    /// Whether this item is an integer.
    #[must_use]
    pub fn is_int(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Int))
    }

    /// Whether this item is a float.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Float))
    }

    /// Whether this item is a text string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::String))
    }

    /// Whether this item is a byte string.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Binary))
    }

    /// Whether this item is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Array))
    }

    /// Whether this item is a map.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.kind_internal(), Ok(Kind::Map))
    }

    /// Reads this item as null.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_null(&self) -> Result<(), SchemaError> {
        self.expect(Kind::Null).map(|_| ())
    }

    /// Reads this item as a boolean.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_bool(&self) -> Result<bool, SchemaError> {
        let (head, _) = self.expect(Kind::Bool)?;
        Ok(head.info == SIMPLE_TRUE)
    }

    /// Reads this item as a signed 64-bit integer.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    #[allow(clippy::cast_possible_wrap)] // arg <= i64::MAX was validated on construction
    pub fn as_int(&self) -> Result<i64, SchemaError> {
        let (head, _) = self.expect(Kind::Int)?;
        if head.major == MAJOR_UNSIGNED {
            Ok(head.arg as i64)
        } else {
            Ok(-1 - head.arg as i64)
        }
    }

    /// Reads this item as a double-precision float.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_float(&self) -> Result<f64, SchemaError> {
        let (head, _) = self.expect(Kind::Float)?;
        Ok(f64::from_bits(head.arg))
    }

    fn collect_string(&self, major: u8, kind: Kind) -> Result<Vec<u8>, SchemaError> {
        let found = self.kind_internal()?;
        let expected = if major == MAJOR_TEXT { Kind::String } else { Kind::Binary };
        if found != expected {
            return Err(SchemaError::KindMismatch {
                expected: kind.name(),
                found: found.name(),
            });
        }
        let (head, at) = self.content()?;
        if head.info != INFO_INDEFINITE {
            let end = arg_len(self.data, head, at).map_err(SchemaError::Corrupt)?;
            return Ok(self.data[head.end..end].to_vec());
        }
        let mut out = Vec::new();
        let mut cursor = head.end;
        loop {
            let byte = *self.data.get(cursor).ok_or(SchemaError::Corrupt(
                CodecError::Truncated { offset: cursor, needed: 1 },
            ))?;
            if byte == BREAK {
                return Ok(out);
            }
            let chunk = read_head(self.data, cursor)?;
            let end = arg_len(self.data, chunk, cursor).map_err(SchemaError::Corrupt)?;
            out.extend_from_slice(&self.data[chunk.end..end]);
            cursor = end;
        }
    }

    /// Reads this item as an owned UTF-8 string, concatenating
    /// indefinite-length chunks.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_string(&self) -> Result<String, SchemaError> {
        let bytes = self.collect_string(MAJOR_TEXT, Kind::String)?;
        String::from_utf8(bytes).map_err(|_| {
            SchemaError::Corrupt(CodecError::InvalidUtf8 { offset: 0 })
        })
    }

    /// Reads this item as an owned byte string, concatenating
    /// indefinite-length chunks.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_binary(&self) -> Result<Vec<u8>, SchemaError> {
        self.collect_string(MAJOR_BYTES, Kind::Binary)
    }

    /// Reads this item as an array of sub-readers.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind.
    pub fn as_array(&self) -> Result<ArrayReader<'a>, SchemaError> {
        let (head, _) = self.expect(Kind::Array)?;
        let mut items = Vec::new();
        let mut cursor = head.end;
        if head.info == INFO_INDEFINITE {
            loop {
                let byte = *self.data.get(cursor).ok_or(SchemaError::Corrupt(
                    CodecError::Truncated { offset: cursor, needed: 1 },
                ))?;
                if byte == BREAK {
                    break;
                }
                let end = skip_item(self.data, cursor, 0)?;
                items.push(Reader::sub(&self.data[cursor..end]));
                cursor = end;
            }
        } else {
            for _ in 0..head.arg {
                let end = skip_item(self.data, cursor, 0)?;
                items.push(Reader::sub(&self.data[cursor..end]));
                cursor = end;
            }
        }
        Ok(ArrayReader { items })
    }

    /// Reads this item as a map from UTF-8 string keys to sub-readers.
    /// Duplicate keys resolve to the last occurrence.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::KindMismatch`] for any other kind, or
    /// when a key is not a text string.
    pub fn as_map(&self) -> Result<MapReader<'a>, SchemaError> {
        let (head, _) = self.expect(Kind::Map)?;
        let mut entries = BTreeMap::new();
        let mut cursor = head.end;
        let mut remaining = head.arg;
        loop {
            if head.info == INFO_INDEFINITE {
                let byte = *self.data.get(cursor).ok_or(SchemaError::Corrupt(
                    CodecError::Truncated { offset: cursor, needed: 1 },
                ))?;
                if byte == BREAK {
                    break;
                }
            } else {
                if remaining == 0 {
                    break;
                }
                remaining -= 1;
            }
            let key_end = skip_item(self.data, cursor, 0)?;
            let key = Reader::sub(&self.data[cursor..key_end]).as_string().map_err(
                |err| match err {
                    SchemaError::KindMismatch { found, .. } => SchemaError::KindMismatch {
                        expected: "string map key",
                        found,
                    },
                    other => other,
                },
            )?;
            let value_end = skip_item(self.data, key_end, 0)?;
            entries.insert(key, Reader::sub(&self.data[key_end..value_end]));
            cursor = value_end;
        }
        Ok(MapReader { entries })
    }
}

/// Indexable sequence of sub-readers produced by [`Reader::as_array`].
#[derive(Debug, Clone)]
pub struct ArrayReader<'a> {
    items: Vec<Reader<'a>>,
}

impl<'a> ArrayReader<'a> {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::IndexOutOfBounds`] past the end.
    pub fn at(&self, index: usize) -> Result<&Reader<'a>, SchemaError> {
        self.items.get(index).ok_or(SchemaError::IndexOutOfBounds {
            index,
            length: self.items.len(),
        })
    }

    /// Element at `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Reader<'a>> {
        self.items.get(index)
    }

    /// Iterates the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &Reader<'a>> {
        self.items.iter()
    }
}

/// Mapping from UTF-8 string keys to sub-readers produced by
/// [`Reader::as_map`].
#[derive(Debug, Clone)]
pub struct MapReader<'a> {
    entries: BTreeMap<String, Reader<'a>>,
}

impl<'a> MapReader<'a> {
    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Value for `key`.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::MissingKey`] when absent.
    pub fn at(&self, key: &str) -> Result<&Reader<'a>, SchemaError> {
        self.entries.get(key).ok_or_else(|| SchemaError::MissingKey {
            key: key.to_owned(),
        })
    }

    /// Value for `key`, or `None` when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Reader<'a>> {
        self.entries.get(key)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Reader<'a>)> {
        self.entries.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_small_integers() {
        let reader = Reader::new(&[0x00]).unwrap();
        assert!(reader.is_int());
        assert_eq!(reader.as_int().unwrap(), 0);

        let reader = Reader::new(&[0x17]).unwrap();
        assert_eq!(reader.as_int().unwrap(), 23);

        let reader = Reader::new(&[0x20]).unwrap();
        assert_eq!(reader.as_int().unwrap(), -1);
    }

    #[test]
    fn reads_wide_integers() {
        let reader = Reader::new(&[0x1B, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(reader.as_int().unwrap(), i64::MAX);

        let reader = Reader::new(&[0x3B, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(reader.as_int().unwrap(), i64::MIN);
    }

    #[test]
    fn rejects_unsigned_past_i64() {
        let err = Reader::new(&[0x1B, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::IntegerOverflow { .. }));
    }

    #[test]
    fn rejects_unsupported_floats_and_undefined() {
        assert!(matches!(
            Reader::new(&[0xF9, 0x00, 0x00]).unwrap_err(),
            CodecError::Unsupported { byte: 0xF9, .. }
        ));
        assert!(matches!(
            Reader::new(&[0xFA, 0x00, 0x00, 0x00, 0x00]).unwrap_err(),
            CodecError::Unsupported { byte: 0xFA, .. }
        ));
        assert!(matches!(
            Reader::new(&[0xF7]).unwrap_err(),
            CodecError::Unsupported { byte: 0xF7, .. }
        ));
    }

    #[test]
    fn rejects_stray_break_and_trailing_bytes() {
        assert!(matches!(
            Reader::new(&[0xFF]).unwrap_err(),
            CodecError::Malformed { .. }
        ));
        assert!(matches!(
            Reader::new(&[0x00, 0x00]).unwrap_err(),
            CodecError::TrailingBytes { .. }
        ));
    }

    #[test]
    fn typed_accessor_mismatch_is_schema_error() {
        let reader = Reader::new(&[0x00]).unwrap();
        let err = reader.as_string().unwrap_err();
        assert!(matches!(err, SchemaError::KindMismatch { expected: "string", found: "integer" }));
    }

    #[test]
    fn skips_semantic_tags() {
        // 0xC1 (tag 1) wrapping the integer 5.
        let reader = Reader::new(&[0xC1, 0x05]).unwrap();
        assert!(reader.is_int());
        assert_eq!(reader.as_int().unwrap(), 5);
    }

    #[test]
    fn map_duplicate_keys_last_wins() {
        // {"a": 1, "a": 2}
        let reader = Reader::new(&[0xA2, 0x61, 0x61, 0x01, 0x61, 0x61, 0x02]).unwrap();
        let map = reader.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.at("a").unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn indefinite_string_chunks_concatenate() {
        // (_ "he" "llo")
        let reader =
            Reader::new(&[0x7F, 0x62, 0x68, 0x65, 0x63, 0x6C, 0x6C, 0x6F, 0xFF]).unwrap();
        assert_eq!(reader.as_string().unwrap(), "hello");
    }

    #[test]
    fn indefinite_string_chunk_of_wrong_major_is_malformed() {
        // (_ "he" h'6C6C6F') — byte chunk inside a text string.
        let err =
            Reader::new(&[0x7F, 0x62, 0x68, 0x65, 0x43, 0x6C, 0x6C, 0x6F, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn rejects_invalid_utf8_text() {
        let err = Reader::new(&[0x62, 0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8 { .. }));
    }

    #[test]
    fn nested_structures_walk() {
        // [1, [2, 3], {"k": true}]
        let bytes = [
            0x83, 0x01, 0x82, 0x02, 0x03, 0xA1, 0x61, 0x6B, 0xF5,
        ];
        let reader = Reader::new(&bytes).unwrap();
        let array = reader.as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.at(0).unwrap().as_int().unwrap(), 1);
        let inner = array.at(1).unwrap().as_array().unwrap();
        assert_eq!(inner.at(1).unwrap().as_int().unwrap(), 3);
        let map = array.at(2).unwrap().as_map().unwrap();
        assert!(map.at("k").unwrap().as_bool().unwrap());
    }
}
