//! MessagePack encoder
//!
//! Layout:
//! - document: map header with the field count, then (name, value) pairs
//! - array: array header with the element count, then values
//! - integer: the most compact MessagePack integer form
//! - double: float 64
//! - duration: fixext 8 with type [`DURATION_TYPE`], big-endian nanoseconds

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use super::DURATION_TYPE;
use crate::document::{self, Array, Document, Value};
use crate::errors::{DbError, DbResult};
use crate::stream::Control;

/// Encodes values into a writer.
pub struct Encoder<W: Write> {
    wr: W,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder writing into `wr`.
    pub fn new(wr: W) -> Self {
        Self { wr }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.wr
    }

    /// Encodes `d` as a map.
    ///
    /// The header count comes from the length accessor when the
    /// representation has an exact one, otherwise from a counting pass over
    /// `d`. Either way it must match the pairs written.
    pub fn encode_document(&mut self, d: &dyn Document) -> DbResult<()> {
        let len = document::length(d)?;
        rmp::encode::write_map_len(&mut self.wr, container_len(len)?)?;

        let mut written = 0usize;
        d.iterate(&mut |field, value| {
            rmp::encode::write_str(&mut self.wr, field)?;
            self.encode_value(value)?;
            written += 1;
            Ok(Control::Continue)
        })?;

        if written != len {
            return Err(DbError::format(format!(
                "Document yielded {} fields but {} were announced",
                written, len
            )));
        }
        Ok(())
    }

    /// Encodes `a` as an array.
    pub fn encode_array(&mut self, a: &dyn Array) -> DbResult<()> {
        let len = document::array_length(a)?;
        rmp::encode::write_array_len(&mut self.wr, container_len(len)?)?;

        let mut written = 0usize;
        a.iterate(&mut |_, value| {
            self.encode_value(value)?;
            written += 1;
            Ok(Control::Continue)
        })?;

        if written != len {
            return Err(DbError::format(format!(
                "Array yielded {} elements but {} were announced",
                written, len
            )));
        }
        Ok(())
    }

    /// Encodes `v` based on its type.
    pub fn encode_value(&mut self, v: &Value) -> DbResult<()> {
        match v {
            Value::Document(d) => self.encode_document(d),
            Value::Array(a) => self.encode_array(a),
            Value::Null => Ok(rmp::encode::write_nil(&mut self.wr)?),
            Value::Bool(b) => Ok(rmp::encode::write_bool(&mut self.wr, *b)?),
            Value::Integer(i) => {
                rmp::encode::write_sint(&mut self.wr, *i)?;
                Ok(())
            }
            Value::Double(f) => Ok(rmp::encode::write_f64(&mut self.wr, *f)?),
            Value::Text(s) => Ok(rmp::encode::write_str(&mut self.wr, s)?),
            Value::Blob(b) => Ok(rmp::encode::write_bin(&mut self.wr, b)?),
            Value::Duration(d) => {
                let nanos = d.num_nanoseconds().ok_or_else(|| {
                    DbError::type_mismatch(format!(
                        "Duration {} does not fit in 64-bit nanoseconds",
                        d
                    ))
                })?;
                rmp::encode::write_ext_meta(&mut self.wr, 8, DURATION_TYPE)?;
                self.wr.write_i64::<BigEndian>(nanos)?;
                Ok(())
            }
        }
    }
}

fn container_len(len: usize) -> DbResult<u32> {
    u32::try_from(len)
        .map_err(|_| DbError::type_mismatch(format!("Container of {} entries is too large", len)))
}
