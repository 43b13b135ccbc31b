//! MessagePack decoder
//!
//! The decoder walks a byte buffer one value at a time. Containers are not
//! decoded eagerly: only their extent is measured so the raw span can be
//! handed to a lazy [`EncodedDocument`] / [`EncodedArray`].

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use rmp::Marker;

use super::encoded::{EncodedArray, EncodedDocument};
use super::DURATION_TYPE;
use crate::document::Value;
use crate::errors::{DbError, DbResult};

/// Decodes values from a MessagePack buffer.
pub struct Decoder {
    buf: Bytes,
    pos: usize,
}

impl Decoder {
    /// Creates a decoder positioned at the start of `buf`.
    pub fn new(buf: Bytes) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the current read offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the marker of the next value without consuming it.
    pub fn peek_marker(&self) -> DbResult<Marker> {
        match self.buf.get(self.pos) {
            Some(b) => Ok(Marker::from_u8(*b)),
            None => Err(DbError::truncated(1, self.pos)),
        }
    }

    /// Decodes the next value.
    ///
    /// Documents and arrays come back as lazy handles over their raw bytes.
    pub fn decode_value(&mut self) -> DbResult<Value> {
        let marker = self.peek_marker()?;
        match marker {
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
                Ok(Value::from(self.decode_array()?))
            }
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                Ok(Value::from(self.decode_document()?))
            }
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                let range = self.read_str_range()?;
                let s = std::str::from_utf8(&self.buf[range])
                    .map_err(|e| DbError::format(format!("Invalid UTF-8 in text value: {}", e)))?;
                Ok(Value::Text(s.to_string()))
            }
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16
            | Marker::Ext8
            | Marker::Ext16
            | Marker::Ext32 => self.decode_extension(),
            _ => {
                self.pos += 1;
                self.decode_scalar(marker)
            }
        }
    }

    /// Decodes the next value as a lazy document.
    ///
    /// Only the extent of the map is checked; malformed fields surface when
    /// the returned document is iterated.
    pub fn decode_document(&mut self) -> DbResult<EncodedDocument> {
        match self.peek_marker()? {
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {}
            other => return Err(unexpected("map", other)),
        }
        let start = self.pos;
        self.skip_value()?;
        Ok(EncodedDocument::new(self.buf.slice(start..self.pos)))
    }

    /// Decodes the next value as a lazy array.
    pub fn decode_array(&mut self) -> DbResult<EncodedArray> {
        match self.peek_marker()? {
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {}
            other => return Err(unexpected("array", other)),
        }
        let start = self.pos;
        self.skip_value()?;
        Ok(EncodedArray::new(self.buf.slice(start..self.pos)))
    }

    /// Reads a map header and returns its declared entry count.
    pub fn read_map_len(&mut self) -> DbResult<usize> {
        match self.read_marker()? {
            Marker::FixMap(n) => Ok(n as usize),
            Marker::Map16 => Ok(self.read_u16()? as usize),
            Marker::Map32 => Ok(self.read_u32()? as usize),
            other => Err(unexpected("map", other)),
        }
    }

    /// Reads an array header and returns its declared element count.
    pub fn read_array_len(&mut self) -> DbResult<usize> {
        match self.read_marker()? {
            Marker::FixArray(n) => Ok(n as usize),
            Marker::Array16 => Ok(self.read_u16()? as usize),
            Marker::Array32 => Ok(self.read_u32()? as usize),
            other => Err(unexpected("array", other)),
        }
    }

    /// Reads a string header and returns the byte range of its payload.
    pub(crate) fn read_str_range(&mut self) -> DbResult<Range<usize>> {
        let len = match self.read_marker()? {
            Marker::FixStr(n) => n as usize,
            Marker::Str8 => self.read_u8()? as usize,
            Marker::Str16 => self.read_u16()? as usize,
            Marker::Str32 => self.read_u32()? as usize,
            other => return Err(unexpected("string", other)),
        };
        self.take(len)
    }

    /// Moves past the next value, including everything nested in it.
    pub fn skip_value(&mut self) -> DbResult<()> {
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            let marker = self.read_marker()?;
            let payload = match marker {
                Marker::Null | Marker::True | Marker::False => 0,
                Marker::FixPos(_) | Marker::FixNeg(_) => 0,
                Marker::U8 | Marker::I8 => 1,
                Marker::U16 | Marker::I16 => 2,
                Marker::U32 | Marker::I32 | Marker::F32 => 4,
                Marker::U64 | Marker::I64 | Marker::F64 => 8,
                Marker::FixStr(n) => n as usize,
                Marker::Str8 | Marker::Bin8 => self.read_u8()? as usize,
                Marker::Str16 | Marker::Bin16 => self.read_u16()? as usize,
                Marker::Str32 | Marker::Bin32 => self.read_u32()? as usize,
                Marker::FixArray(n) => {
                    pending = grow(pending, n as usize, 1)?;
                    0
                }
                Marker::Array16 => {
                    let n = self.read_u16()? as usize;
                    pending = grow(pending, n, 1)?;
                    0
                }
                Marker::Array32 => {
                    let n = self.read_u32()? as usize;
                    pending = grow(pending, n, 1)?;
                    0
                }
                Marker::FixMap(n) => {
                    pending = grow(pending, n as usize, 2)?;
                    0
                }
                Marker::Map16 => {
                    let n = self.read_u16()? as usize;
                    pending = grow(pending, n, 2)?;
                    0
                }
                Marker::Map32 => {
                    let n = self.read_u32()? as usize;
                    pending = grow(pending, n, 2)?;
                    0
                }
                Marker::FixExt1
                | Marker::FixExt2
                | Marker::FixExt4
                | Marker::FixExt8
                | Marker::FixExt16
                | Marker::Ext8
                | Marker::Ext16
                | Marker::Ext32 => self.read_ext_header(marker)?.0,
                Marker::Reserved => return Err(unsupported(marker)),
            };
            self.take(payload)?;
        }
        Ok(())
    }

    fn decode_scalar(&mut self, marker: Marker) -> DbResult<Value> {
        let value = match marker {
            Marker::Null => Value::Null,
            Marker::True => Value::Bool(true),
            Marker::False => Value::Bool(false),
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => {
                let len = match marker {
                    Marker::Bin8 => self.read_u8()? as usize,
                    Marker::Bin16 => self.read_u16()? as usize,
                    _ => self.read_u32()? as usize,
                };
                let range = self.take(len)?;
                Value::Blob(self.buf[range].to_vec())
            }
            Marker::FixPos(n) => Value::Integer(n as i64),
            Marker::FixNeg(n) => Value::Integer(n as i64),
            Marker::U8 => Value::Integer(self.read_u8()? as i64),
            Marker::U16 => Value::Integer(self.read_u16()? as i64),
            Marker::U32 => Value::Integer(self.read_u32()? as i64),
            Marker::U64 => {
                let n = self.read_u64()?;
                let n = i64::try_from(n).map_err(|_| {
                    DbError::format(format!("Unsigned integer {} overflows a 64-bit signed integer", n))
                })?;
                Value::Integer(n)
            }
            Marker::I8 => Value::Integer(self.read_u8()? as i8 as i64),
            Marker::I16 => Value::Integer(self.read_u16()? as i16 as i64),
            Marker::I32 => Value::Integer(self.read_u32()? as i32 as i64),
            Marker::I64 => Value::Integer(self.read_u64()? as i64),
            Marker::F32 => Value::Double(f32::from_bits(self.read_u32()?) as f64),
            Marker::F64 => Value::Double(f64::from_bits(self.read_u64()?)),
            other => return Err(unsupported(other)),
        };
        Ok(value)
    }

    fn decode_extension(&mut self) -> DbResult<Value> {
        let marker = self.read_marker()?;
        let (len, type_id) = self.read_ext_header(marker)?;
        if type_id != DURATION_TYPE {
            return Err(DbError::format(format!("Unknown extension type {}", type_id)));
        }
        if len != 8 {
            return Err(DbError::format(format!(
                "Duration extension must be 8 bytes, found {}",
                len
            )));
        }
        let range = self.take(8)?;
        Ok(Value::duration_nanos(BigEndian::read_i64(&self.buf[range])))
    }

    /// Returns (payload length, type id) for an extension marker.
    fn read_ext_header(&mut self, marker: Marker) -> DbResult<(usize, i8)> {
        let len = match marker {
            Marker::FixExt1 => 1,
            Marker::FixExt2 => 2,
            Marker::FixExt4 => 4,
            Marker::FixExt8 => 8,
            Marker::FixExt16 => 16,
            Marker::Ext8 => self.read_u8()? as usize,
            Marker::Ext16 => self.read_u16()? as usize,
            Marker::Ext32 => self.read_u32()? as usize,
            other => return Err(unexpected("extension", other)),
        };
        let type_id = self.read_u8()? as i8;
        Ok((len, type_id))
    }

    fn read_marker(&mut self) -> DbResult<Marker> {
        let marker = self.peek_marker()?;
        self.pos += 1;
        Ok(marker)
    }

    fn take(&mut self, n: usize) -> DbResult<Range<usize>> {
        if self.remaining() < n {
            return Err(DbError::truncated(n, self.pos));
        }
        let start = self.pos;
        self.pos += n;
        Ok(start..self.pos)
    }

    fn read_u8(&mut self) -> DbResult<u8> {
        let range = self.take(1)?;
        Ok(self.buf[range.start])
    }

    fn read_u16(&mut self) -> DbResult<u16> {
        let range = self.take(2)?;
        Ok(BigEndian::read_u16(&self.buf[range]))
    }

    fn read_u32(&mut self) -> DbResult<u32> {
        let range = self.take(4)?;
        Ok(BigEndian::read_u32(&self.buf[range]))
    }

    fn read_u64(&mut self) -> DbResult<u64> {
        let range = self.take(8)?;
        Ok(BigEndian::read_u64(&self.buf[range]))
    }
}

fn grow(pending: usize, count: usize, per_entry: usize) -> DbResult<usize> {
    count
        .checked_mul(per_entry)
        .and_then(|n| pending.checked_add(n))
        .ok_or_else(|| DbError::format("Container length overflow"))
}

fn unexpected(expected: &str, found: Marker) -> DbError {
    DbError::format(format!(
        "Expected {} marker, found 0x{:02x}",
        expected,
        found.to_u8()
    ))
}

fn unsupported(marker: Marker) -> DbError {
    DbError::format(format!("Unsupported type marker 0x{:02x}", marker.to_u8()))
}
