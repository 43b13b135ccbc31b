//! Lazily decoded documents and arrays
//!
//! Construction never inspects the bytes. Iteration and lookups decode one
//! field or element at a time, so a malformed region only fails when it is
//! actually reached.

use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use super::decoder::Decoder;
use crate::document::{Array, Document, Value};
use crate::errors::{DbError, DbResult};
use crate::stream::Control;

/// A document backed by its MessagePack encoding.
#[derive(Clone)]
pub struct EncodedDocument {
    raw: Bytes,
}

impl EncodedDocument {
    /// Wraps raw bytes. If the document is malformed this does not fail,
    /// but iteration and lookups will.
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the raw encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the field count from the map header, without checking it
    /// against the fields actually present.
    pub fn declared_len(&self) -> DbResult<usize> {
        Decoder::new(self.raw.clone()).read_map_len()
    }
}

impl Document for EncodedDocument {
    fn iterate(&self, visit: &mut dyn FnMut(&str, &Value) -> DbResult<Control>) -> DbResult<()> {
        let mut dec = Decoder::new(self.raw.clone());
        let n = dec.read_map_len()?;
        for _ in 0..n {
            let key = dec.read_str_range()?;
            let value = dec.decode_value()?;
            if visit(field_name(&self.raw, key)?, &value)? == Control::Stop {
                break;
            }
        }
        Ok(())
    }

    fn get_by_field(&self, field: &str) -> DbResult<Option<Value>> {
        let mut dec = Decoder::new(self.raw.clone());
        let n = dec.read_map_len()?;
        for _ in 0..n {
            let key = dec.read_str_range()?;
            if &self.raw[key] == field.as_bytes() {
                return dec.decode_value().map(Some);
            }
            dec.skip_value()?;
        }
        Ok(None)
    }
}

impl fmt::Debug for EncodedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedDocument")
            .field("bytes", &self.raw.len())
            .finish()
    }
}

/// An array backed by its MessagePack encoding.
#[derive(Clone)]
pub struct EncodedArray {
    raw: Bytes,
}

impl EncodedArray {
    /// Wraps raw bytes. If the array is malformed this does not fail,
    /// but iteration and lookups will.
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the raw encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the element count from the array header.
    pub fn declared_len(&self) -> DbResult<usize> {
        Decoder::new(self.raw.clone()).read_array_len()
    }
}

impl Array for EncodedArray {
    fn iterate(&self, visit: &mut dyn FnMut(usize, &Value) -> DbResult<Control>) -> DbResult<()> {
        let mut dec = Decoder::new(self.raw.clone());
        let n = dec.read_array_len()?;
        for i in 0..n {
            let value = dec.decode_value()?;
            if visit(i, &value)? == Control::Stop {
                break;
            }
        }
        Ok(())
    }

    fn get_by_index(&self, index: usize) -> DbResult<Option<Value>> {
        let mut dec = Decoder::new(self.raw.clone());
        let n = dec.read_array_len()?;
        if index >= n {
            return Ok(None);
        }
        for _ in 0..index {
            dec.skip_value()?;
        }
        dec.decode_value().map(Some)
    }
}

impl fmt::Debug for EncodedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedArray")
            .field("bytes", &self.raw.len())
            .finish()
    }
}

fn field_name(raw: &Bytes, range: Range<usize>) -> DbResult<&str> {
    std::str::from_utf8(&raw[range])
        .map_err(|e| DbError::format(format!("Invalid UTF-8 in field name: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    // {"a": 1, "b": "x"}
    const DOC: &[u8] = &[0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0xa1, b'x'];

    #[test]
    fn test_lookup_by_field() {
        let d = EncodedDocument::new(Bytes::from_static(DOC));
        assert_eq!(d.get_by_field("b").unwrap(), Some(Value::from("x")));
        assert_eq!(d.get_by_field("c").unwrap(), None);
    }

    #[test]
    fn test_garbage_fails_only_on_access() {
        let d = EncodedDocument::new(Bytes::from_static(&[0xc1, 0xc1]));
        let err = d.iterate(&mut |_, _| Ok(Control::Continue)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FormatError);
        assert!(d.get_by_field("a").is_err());
    }

    #[test]
    fn test_declared_len_may_lie() {
        // header says 3 fields, only one is present
        let d = EncodedDocument::new(Bytes::from_static(&[0x83, 0xa1, b'a', 0x01]));
        assert_eq!(d.declared_len().unwrap(), 3);
        assert!(crate::document::length(&d).is_err());
    }

    #[test]
    fn test_array_get_by_index_skips() {
        // [1, [2, 3], "z"]
        let a = EncodedArray::new(Bytes::from_static(&[0x93, 0x01, 0x92, 0x02, 0x03, 0xa1, b'z']));
        assert_eq!(a.get_by_index(2).unwrap(), Some(Value::from("z")));
        assert_eq!(a.get_by_index(3).unwrap(), None);
    }
}
