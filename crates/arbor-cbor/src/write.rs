// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Streaming CBOR writer.
//!
//! [`Writer`] produces a single root map. Nested maps and arrays are
//! written through [`MapWriter`] and [`ArrayWriter`] handles that
//! mutably borrow their parent, so only the innermost handle is ever
//! writable; the shadowed-handle misuse of a stack-based writer is a
//! compile error here rather than a runtime fault.
//!
//! Containers use indefinite-length encoding and are break-terminated
//! on `close` (or on drop, best effort). Integers use the minimal
//! 1/2/3/5/9-byte head; floats are always double-precision; map keys
//! are written in the order the caller appends them.

use std::io::Write;

use crate::error::CodecError;

const BREAK: u8 = 0xFF;
const START_ARRAY: u8 = 0x9F;
const START_MAP: u8 = 0xBF;
const NULL: u8 = 0xF6;
const FALSE: u8 = 0xF4;
const TRUE: u8 = 0xF5;
const DOUBLE: u8 = 0xFB;

fn write_head(sink: &mut dyn Write, major: u8, value: u64) -> Result<(), CodecError> {
    let base = major << 5;
    if value < 24 {
        sink.write_all(&[base | value as u8])?;
    } else if value <= u64::from(u8::MAX) {
        sink.write_all(&[base | 24, value as u8])?;
    } else if value <= u64::from(u16::MAX) {
        sink.write_all(&[base | 25])?;
        sink.write_all(&(value as u16).to_be_bytes())?;
    } else if value <= u64::from(u32::MAX) {
        sink.write_all(&[base | 26])?;
        sink.write_all(&(value as u32).to_be_bytes())?;
    } else {
        sink.write_all(&[base | 27])?;
        sink.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

#[allow(clippy::cast_sign_loss)] // the sign is split off before the cast
fn write_int(sink: &mut dyn Write, value: i64) -> Result<(), CodecError> {
    if value >= 0 {
        write_head(sink, 0, value as u64)
    } else {
        write_head(sink, 1, !(value as u64))
    }
}

fn write_float(sink: &mut dyn Write, value: f64) -> Result<(), CodecError> {
    sink.write_all(&[DOUBLE])?;
    sink.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_text(sink: &mut dyn Write, value: &str) -> Result<(), CodecError> {
    write_head(sink, 3, value.len() as u64)?;
    sink.write_all(value.as_bytes())?;
    Ok(())
}

fn write_bytes(sink: &mut dyn Write, value: &[u8]) -> Result<(), CodecError> {
    write_head(sink, 2, value.len() as u64)?;
    sink.write_all(value)?;
    Ok(())
}

/// Entry point for writing one CBOR document to a byte sink.
pub struct Writer<'w> {
    sink: &'w mut dyn Write,
}

impl<'w> Writer<'w> {
    /// Creates a writer over the given sink.
    pub fn new(sink: &'w mut dyn Write) -> Self {
        Self { sink }
    }

    /// Opens the single root map and consumes the writer.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn root(self) -> Result<MapWriter<'w>, CodecError> {
        self.sink.write_all(&[START_MAP])?;
        Ok(MapWriter {
            sink: self.sink,
            closed: false,
        })
    }
}

/// Handle for appending key/value pairs to an open map.
///
/// Dropping the handle terminates the map with a break byte on a best
/// effort basis; call [`MapWriter::close`] to surface sink errors.
pub struct MapWriter<'w> {
    sink: &'w mut dyn Write,
    closed: bool,
}

impl<'w> MapWriter<'w> {
    fn key(&mut self, key: &str) -> Result<(), CodecError> {
        write_text(self.sink, key)
    }

    /// Appends a null value under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_null(&mut self, key: &str) -> Result<(), CodecError> {
        self.key(key)?;
        self.sink.write_all(&[NULL])?;
        Ok(())
    }

    /// Appends a boolean under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_bool(&mut self, key: &str, value: bool) -> Result<(), CodecError> {
        self.key(key)?;
        self.sink.write_all(&[if value { TRUE } else { FALSE }])?;
        Ok(())
    }

    /// Appends a signed integer under `key`, minimally encoded.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_int(&mut self, key: &str, value: i64) -> Result<(), CodecError> {
        self.key(key)?;
        write_int(self.sink, value)
    }

    /// Appends a double-precision float under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_float(&mut self, key: &str, value: f64) -> Result<(), CodecError> {
        self.key(key)?;
        write_float(self.sink, value)
    }

    /// Appends a UTF-8 string under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_string(&mut self, key: &str, value: &str) -> Result<(), CodecError> {
        self.key(key)?;
        write_text(self.sink, value)
    }

    /// Appends a byte string under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_binary(&mut self, key: &str, value: &[u8]) -> Result<(), CodecError> {
        self.key(key)?;
        write_bytes(self.sink, value)
    }

    /// Opens a nested array under `key`. The returned handle borrows
    /// this one; this map becomes writable again once it is closed.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_array(&mut self, key: &str) -> Result<ArrayWriter<'_>, CodecError> {
        self.key(key)?;
        self.sink.write_all(&[START_ARRAY])?;
        Ok(ArrayWriter {
            sink: &mut *self.sink,
            closed: false,
        })
    }

    /// Opens a nested map under `key`. The returned handle borrows
    /// this one; this map becomes writable again once it is closed.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_map(&mut self, key: &str) -> Result<MapWriter<'_>, CodecError> {
        self.key(key)?;
        self.sink.write_all(&[START_MAP])?;
        Ok(MapWriter {
            sink: &mut *self.sink,
            closed: false,
        })
    }

    /// Terminates the map.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the break byte.
    pub fn close(mut self) -> Result<(), CodecError> {
        self.closed = true;
        self.sink.write_all(&[BREAK])?;
        Ok(())
    }
}

impl Drop for MapWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.sink.write_all(&[BREAK]);
        }
    }
}

/// Handle for appending elements to an open array.
///
/// Dropping the handle terminates the array with a break byte on a best
/// effort basis; call [`ArrayWriter::close`] to surface sink errors.
pub struct ArrayWriter<'w> {
    sink: &'w mut dyn Write,
    closed: bool,
}

impl<'w> ArrayWriter<'w> {
    /// Appends a null element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_null(&mut self) -> Result<(), CodecError> {
        self.sink.write_all(&[NULL])?;
        Ok(())
    }

    /// Appends a boolean element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.sink.write_all(&[if value { TRUE } else { FALSE }])?;
        Ok(())
    }

    /// Appends a signed integer element, minimally encoded.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_int(&mut self, value: i64) -> Result<(), CodecError> {
        write_int(self.sink, value)
    }

    /// Appends a double-precision float element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_float(&mut self, value: f64) -> Result<(), CodecError> {
        write_float(self.sink, value)
    }

    /// Appends a UTF-8 string element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_string(&mut self, value: &str) -> Result<(), CodecError> {
        write_text(self.sink, value)
    }

    /// Appends a byte string element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_binary(&mut self, value: &[u8]) -> Result<(), CodecError> {
        write_bytes(self.sink, value)
    }

    /// Opens a nested array element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_array(&mut self) -> Result<ArrayWriter<'_>, CodecError> {
        self.sink.write_all(&[START_ARRAY])?;
        Ok(ArrayWriter {
            sink: &mut *self.sink,
            closed: false,
        })
    }

    /// Opens a nested map element.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the write.
    pub fn append_map(&mut self) -> Result<MapWriter<'_>, CodecError> {
        self.sink.write_all(&[START_MAP])?;
        Ok(MapWriter {
            sink: &mut *self.sink,
            closed: false,
        })
    }

    /// Terminates the array.
    ///
    /// # Errors
    ///
    /// Fails when the sink rejects the break byte.
    pub fn close(mut self) -> Result<(), CodecError> {
        self.closed = true;
        self.sink.write_all(&[BREAK])?;
        Ok(())
    }
}

impl Drop for ArrayWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.sink.write_all(&[BREAK]);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::read::Reader;

    #[test]
    fn integer_heads_are_minimal() {
        let mut buf = Vec::new();
        write_int(&mut buf, 23).unwrap();
        write_int(&mut buf, 24).unwrap();
        write_int(&mut buf, 256).unwrap();
        write_int(&mut buf, 65536).unwrap();
        write_int(&mut buf, 4_294_967_296).unwrap();
        assert_eq!(
            buf,
            [
                0x17, // 23
                0x18, 0x18, // 24
                0x19, 0x01, 0x00, // 256
                0x1A, 0x00, 0x01, 0x00, 0x00, // 65536
                0x1B, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // 2^32
            ]
        );
    }

    #[test]
    fn negative_integers_encode_as_major_one() {
        let mut buf = Vec::new();
        write_int(&mut buf, -1).unwrap();
        write_int(&mut buf, -256).unwrap();
        assert_eq!(buf, [0x20, 0x38, 0xFF]);
    }

    #[test]
    fn root_map_roundtrips_through_reader() {
        let mut buf = Vec::new();
        {
            let mut map = Writer::new(&mut buf).root().unwrap();
            map.append_null("null").unwrap();
            map.append_bool("flag", true).unwrap();
            map.append_int("answer", 42).unwrap();
            map.append_float("pi", std::f64::consts::PI).unwrap();
            map.append_string("greeting", "hello").unwrap();
            map.append_binary("blob", b"world").unwrap();
            let mut inner = map.append_array("items").unwrap();
            inner.append_int(1).unwrap();
            inner.append_int(2).unwrap();
            inner.close().unwrap();
            map.close().unwrap();
        }

        let reader = Reader::new(&buf).unwrap();
        let map = reader.as_map().unwrap();
        assert_eq!(map.len(), 7);
        map.at("null").unwrap().as_null().unwrap();
        assert!(map.at("flag").unwrap().as_bool().unwrap());
        assert_eq!(map.at("answer").unwrap().as_int().unwrap(), 42);
        assert_eq!(
            map.at("pi").unwrap().as_float().unwrap(),
            std::f64::consts::PI
        );
        assert_eq!(map.at("greeting").unwrap().as_string().unwrap(), "hello");
        assert_eq!(map.at("blob").unwrap().as_binary().unwrap(), b"world");
        let items = map.at("items").unwrap().as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.at(1).unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn dropped_handles_still_terminate_containers() {
        let mut buf = Vec::new();
        {
            let mut map = Writer::new(&mut buf).root().unwrap();
            let _inner = map.append_map("inner").unwrap();
            // Both handles dropped without close().
        }
        let reader = Reader::new(&buf).unwrap();
        let map = reader.as_map().unwrap();
        assert!(map.at("inner").unwrap().is_map());
    }

    #[test]
    fn extreme_integers_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut map = Writer::new(&mut buf).root().unwrap();
            map.append_int("max", i64::MAX).unwrap();
            map.append_int("min", i64::MIN).unwrap();
            map.close().unwrap();
        }
        let reader = Reader::new(&buf).unwrap();
        let map = reader.as_map().unwrap();
        assert_eq!(map.at("max").unwrap().as_int().unwrap(), i64::MAX);
        assert_eq!(map.at("min").unwrap().as_int().unwrap(), i64::MIN);
    }
}
