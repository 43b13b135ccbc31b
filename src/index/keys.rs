//! Order-preserving index keys
//!
//! Comparing two key byte strings with `memcmp` gives the same answer as
//! comparing the values they came from. Every encoding is self-delimiting,
//! so a primary key can be appended without disturbing the order.

use byteorder::{BigEndian, ByteOrder};

use crate::document::{Array, Document, Value};
use crate::errors::{DbError, DbResult};
use crate::stream::Control;

const TERMINATOR: u8 = 0x00;
const FIELD_MARKER: u8 = 0x01;
const ESCAPE: u8 = 0xFF;
const END_OF_BYTES: u8 = 0x01;

/// Coarse ordering class of a value. Keys from a lower band always sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeBand {
    Null,
    Bool,
    /// Integer and Double share a band and compare as f64
    Number,
    Duration,
    Text,
    Blob,
    Array,
    Document,
}

impl TypeBand {
    /// Returns the band of a value
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Null => TypeBand::Null,
            Value::Bool(_) => TypeBand::Bool,
            Value::Integer(_) | Value::Double(_) => TypeBand::Number,
            Value::Duration(_) => TypeBand::Duration,
            Value::Text(_) => TypeBand::Text,
            Value::Blob(_) => TypeBand::Blob,
            Value::Array(_) => TypeBand::Array,
            Value::Document(_) => TypeBand::Document,
        }
    }

    /// Leading key byte for the band
    pub fn prefix(self) -> u8 {
        match self {
            TypeBand::Null => 0x02,
            TypeBand::Bool => 0x03,
            TypeBand::Number => 0x04,
            TypeBand::Duration => 0x05,
            TypeBand::Text => 0x06,
            TypeBand::Blob => 0x07,
            TypeBand::Array => 0x08,
            TypeBand::Document => 0x09,
        }
    }
}

/// Key byte encoding for indexed values.
pub struct IndexKey;

impl IndexKey {
    /// Encodes `v` into order-preserving bytes.
    pub fn from_value(v: &Value) -> DbResult<Vec<u8>> {
        let mut out = Vec::with_capacity(16);
        Self::append(&mut out, v)?;
        Ok(out)
    }

    /// Appends the key bytes of `v` to `out`.
    pub fn append(out: &mut Vec<u8>, v: &Value) -> DbResult<()> {
        out.push(TypeBand::of(v).prefix());
        match v {
            Value::Null => {}
            Value::Bool(b) => out.push(u8::from(*b)),
            Value::Integer(i) => push_u64(out, Self::from_float(*i as f64)),
            Value::Double(f) => push_u64(out, Self::from_float(*f)),
            Value::Duration(d) => {
                let nanos = d.num_nanoseconds().ok_or_else(|| {
                    DbError::type_mismatch("duration does not fit in 64-bit nanoseconds")
                })?;
                push_u64(out, (nanos as u64) ^ (1 << 63));
            }
            Value::Text(s) => push_escaped(out, s.as_bytes()),
            Value::Blob(b) => push_escaped(out, b),
            Value::Array(a) => {
                a.iterate(&mut |_, elem| {
                    Self::append(out, elem)?;
                    Ok(Control::Continue)
                })?;
                out.push(TERMINATOR);
            }
            Value::Document(d) => {
                d.iterate(&mut |field, elem| {
                    out.push(FIELD_MARKER);
                    push_escaped(out, field.as_bytes());
                    Self::append(out, elem)?;
                    Ok(Control::Continue)
                })?;
                out.push(TERMINATOR);
            }
        }
        Ok(())
    }

    /// Maps an f64 onto a u64 with the same total order.
    ///
    /// `-0.0` is folded into `0.0` so both compare equal.
    pub fn from_float(v: f64) -> u64 {
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        }
    }
}

fn push_u64(out: &mut Vec<u8>, n: u64) {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, n);
    out.extend_from_slice(&buf);
}

fn push_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        out.push(b);
        if b == TERMINATOR {
            out.push(ESCAPE);
        }
    }
    out.push(TERMINATOR);
    out.push(END_OF_BYTES);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FieldBuffer, ValueBuffer};
    use proptest::prelude::*;

    fn key(v: impl Into<Value>) -> Vec<u8> {
        IndexKey::from_value(&v.into()).unwrap()
    }

    #[test]
    fn test_band_ordering() {
        let keys = vec![
            key(Value::Null),
            key(false),
            key(true),
            key(-100i64),
            key(0.5f64),
            key(100i64),
            key(Value::duration_nanos(-1)),
            key(Value::duration_nanos(1)),
            key("aaa"),
            key("zzz"),
            key(vec![0u8]),
            key(ValueBuffer::new().with(1i64)),
            key(FieldBuffer::new().with("a", 1i64)),
        ];
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_integer_and_double_share_keys() {
        assert_eq!(key(2i64), key(2.0f64));
        assert_eq!(key(0.0f64), key(-0.0f64));
    }

    #[test]
    fn test_text_with_nul_bytes() {
        assert!(key("a") < key("a\0"));
        assert!(key("a\0") < key("a\0b"));
        assert!(key("a\0b") < key("ab"));
    }

    #[test]
    fn test_array_prefix_sorts_first() {
        let short = key(ValueBuffer::new().with(1i64));
        let long = key(ValueBuffer::new().with(1i64).with(Value::Null));
        assert!(short < long);
    }

    proptest! {
        #[test]
        fn prop_float_order(a in any::<f64>(), b in any::<f64>()) {
            prop_assume!(!a.is_nan() && !b.is_nan());
            let expected = a.partial_cmp(&b).unwrap();
            prop_assert_eq!(key(a).cmp(&key(b)), expected);
        }

        #[test]
        fn prop_duration_order(a in any::<i64>(), b in any::<i64>()) {
            let ka = key(Value::duration_nanos(a));
            let kb = key(Value::duration_nanos(b));
            prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        }

        #[test]
        fn prop_text_order(a in ".*", b in ".*") {
            prop_assert_eq!(key(a.as_str()).cmp(&key(b.as_str())), a.as_bytes().cmp(b.as_bytes()));
        }
    }
}
