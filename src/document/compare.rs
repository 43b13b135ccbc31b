//! Value ordering rules
//!
//! - Integer vs Double: the integer is widened to f64
//! - Text and Blob: byte-wise
//! - Duration: signed nanosecond count
//! - Arrays: element-wise, shorter prefix first
//! - Documents: field by field in iteration order (name, then value)
//! - Any other cross-type pair is incomparable

use std::cmp::Ordering;

use super::buffer::{FieldBuffer, ValueBuffer};
use super::value::Value;

impl Value {
    /// Compares two values, returning `None` when they are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                let a = ValueBuffer::from_array(a).ok()?;
                let b = ValueBuffer::from_array(b).ok()?;
                compare_sequences(a.values().iter(), b.values().iter())
            }
            (Value::Document(a), Value::Document(b)) => {
                let a = FieldBuffer::from_document(a).ok()?;
                let b = FieldBuffer::from_document(b).ok()?;
                compare_fields(a.fields(), b.fields())
            }
            _ => None,
        }
    }

    /// Numeric-aware equality: `Integer(2)` equals `Double(2.0)`.
    pub fn is_equal(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

fn compare_sequences<'a>(
    mut a: impl Iterator<Item = &'a Value>,
    mut b: impl Iterator<Item = &'a Value>,
) -> Option<Ordering> {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Some(Ordering::Equal),
            (None, Some(_)) => return Some(Ordering::Less),
            (Some(_), None) => return Some(Ordering::Greater),
            (Some(x), Some(y)) => match x.compare(y)? {
                Ordering::Equal => continue,
                ord => return Some(ord),
            },
        }
    }
}

fn compare_fields(a: &[(String, Value)], b: &[(String, Value)]) -> Option<Ordering> {
    for ((fa, va), (fb, vb)) in a.iter().zip(b.iter()) {
        match fa.as_bytes().cmp(fb.as_bytes()) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        match va.compare(vb)? {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
    }
    Some(a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_type() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Double(3.0).compare(&Value::Integer(3)),
            Some(Ordering::Equal)
        );
        assert!(Value::Integer(3).is_equal(&Value::Double(3.0)));
    }

    #[test]
    fn test_incomparable_types() {
        assert_eq!(Value::Integer(1).compare(&Value::Text("1".into())), None);
        assert_eq!(Value::Integer(1).compare(&Value::duration_nanos(1)), None);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Double(1.0)), None);
    }

    #[test]
    fn test_text_and_blob_bytewise() {
        assert_eq!(
            Value::from("abc").compare(&Value::from("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Blob(vec![0xff]).compare(&Value::Blob(vec![0x00, 0x01])),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_duration_signed() {
        assert_eq!(
            Value::duration_nanos(-5).compare(&Value::duration_nanos(3)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_array_prefix_sorts_first() {
        let short = Value::from(ValueBuffer::new().with(1i64));
        let long = Value::from(ValueBuffer::new().with(1i64).with(0i64));
        assert_eq!(short.compare(&long), Some(Ordering::Less));
    }

    #[test]
    fn test_document_field_order() {
        let a = Value::from(FieldBuffer::new().with("a", 1i64));
        let b = Value::from(FieldBuffer::new().with("a", 2i64));
        assert_eq!(a.compare(&b), Some(Ordering::Less));
    }
}
