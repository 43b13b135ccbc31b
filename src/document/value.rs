//! Value types for quilldb
//!
//! Value is a closed sum type: every payload is matched exhaustively, and a
//! Duration is never an Integer in disguise.

use std::fmt;

use chrono::Duration;

use super::buffer::{FieldBuffer, ValueBuffer};
use super::{Array, Document};
use crate::codec::{EncodedArray, EncodedDocument};
use crate::errors::{DbError, DbResult};
use crate::stream::Control;

/// Type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Integer,
    Double,
    Text,
    Blob,
    Duration,
    Document,
    Array,
}

impl ValueType {
    /// Returns the type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Double => "double",
            ValueType::Text => "text",
            ValueType::Blob => "blob",
            ValueType::Duration => "duration",
            ValueType::Document => "document",
            ValueType::Array => "array",
        }
    }

    /// Returns true for Integer and Double
    pub fn is_number(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Double)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document held by a [`Value`]
#[derive(Debug, Clone)]
pub enum DocumentValue {
    /// In-memory field list
    Buffer(FieldBuffer),
    /// Lazily decoded bytes
    Encoded(EncodedDocument),
}

impl Document for DocumentValue {
    fn iterate(&self, visit: &mut dyn FnMut(&str, &Value) -> DbResult<Control>) -> DbResult<()> {
        match self {
            DocumentValue::Buffer(fb) => fb.iterate(visit),
            DocumentValue::Encoded(ed) => ed.iterate(visit),
        }
    }

    fn get_by_field(&self, field: &str) -> DbResult<Option<Value>> {
        match self {
            DocumentValue::Buffer(fb) => fb.get_by_field(field),
            DocumentValue::Encoded(ed) => ed.get_by_field(field),
        }
    }

    fn exact_len(&self) -> Option<usize> {
        match self {
            DocumentValue::Buffer(fb) => fb.exact_len(),
            DocumentValue::Encoded(ed) => ed.exact_len(),
        }
    }
}

/// An array held by a [`Value`]
#[derive(Debug, Clone)]
pub enum ArrayValue {
    /// In-memory element list
    Buffer(ValueBuffer),
    /// Lazily decoded bytes
    Encoded(EncodedArray),
}

impl Array for ArrayValue {
    fn iterate(&self, visit: &mut dyn FnMut(usize, &Value) -> DbResult<Control>) -> DbResult<()> {
        match self {
            ArrayValue::Buffer(vb) => vb.iterate(visit),
            ArrayValue::Encoded(ea) => ea.iterate(visit),
        }
    }

    fn get_by_index(&self, index: usize) -> DbResult<Option<Value>> {
        match self {
            ArrayValue::Buffer(vb) => vb.get_by_index(index),
            ArrayValue::Encoded(ea) => ea.get_by_index(index),
        }
    }

    fn exact_len(&self) -> Option<usize> {
        match self {
            ArrayValue::Buffer(vb) => vb.exact_len(),
            ArrayValue::Encoded(ea) => ea.exact_len(),
        }
    }
}

/// A storable value
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Double(f64),
    /// UTF-8 string
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
    /// Signed duration, stored as a nanosecond count
    Duration(Duration),
    /// Nested document
    Document(DocumentValue),
    /// Nested array
    Array(ArrayValue),
}

impl Value {
    /// Returns the type tag
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Integer(_) => ValueType::Integer,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::Text,
            Value::Blob(_) => ValueType::Blob,
            Value::Duration(_) => ValueType::Duration,
            Value::Document(_) => ValueType::Document,
            Value::Array(_) => ValueType::Array,
        }
    }

    /// Create a duration value from a nanosecond count
    pub fn duration_nanos(n: i64) -> Self {
        Value::Duration(Duration::nanoseconds(n))
    }

    /// Returns true for Integer and Double
    pub fn is_number(&self) -> bool {
        self.value_type().is_number()
    }

    /// Returns true for Null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentValue> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Converts the value to `target`.
    ///
    /// Defined conversions:
    /// - any type to itself
    /// - Integer to Double
    /// - Double to Integer when the double is integral and in range
    /// - Text to Blob
    ///
    /// Everything else is a type mismatch.
    pub fn convert_to(&self, target: ValueType) -> DbResult<Value> {
        if self.value_type() == target {
            return Ok(self.clone());
        }

        match (self, target) {
            (Value::Integer(i), ValueType::Double) => Ok(Value::Double(*i as f64)),
            (Value::Double(f), ValueType::Integer) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(Value::Integer(*f as i64))
                } else {
                    Err(DbError::type_mismatch(format!(
                        "cannot convert double {} to integer without loss",
                        f
                    )))
                }
            }
            (Value::Text(s), ValueType::Blob) => Ok(Value::Blob(s.as_bytes().to_vec())),
            _ => Err(DbError::type_mismatch(format!(
                "cannot convert {} to {}",
                self.value_type(),
                target
            ))),
        }
    }

    /// Renders the value as JSON
    pub fn to_json(&self) -> DbResult<serde_json::Value> {
        super::json::value_to_json(self)
    }
}

/// Tags must match exactly: `Integer(1) != Double(1.0)`.
/// Use [`Value::compare`] for numeric equality across the two.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => documents_equal(a, b),
            (Value::Array(a), Value::Array(b)) => arrays_equal(a, b),
            _ => false,
        }
    }
}

// Containers that fail to decode are never equal to anything.
fn documents_equal(a: &DocumentValue, b: &DocumentValue) -> bool {
    match (FieldBuffer::from_document(a), FieldBuffer::from_document(b)) {
        (Ok(a), Ok(b)) => a.fields() == b.fields(),
        _ => false,
    }
}

fn arrays_equal(a: &ArrayValue, b: &ArrayValue) -> bool {
    match (ValueBuffer::from_array(a), ValueBuffer::from_array(b)) {
        (Ok(a), Ok(b)) => a.values() == b.values(),
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "<malformed {}>", self.value_type()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<FieldBuffer> for Value {
    fn from(v: FieldBuffer) -> Self {
        Value::Document(DocumentValue::Buffer(v))
    }
}

impl From<ValueBuffer> for Value {
    fn from(v: ValueBuffer) -> Self {
        Value::Array(ArrayValue::Buffer(v))
    }
}

impl From<EncodedDocument> for Value {
    fn from(v: EncodedDocument) -> Self {
        Value::Document(DocumentValue::Encoded(v))
    }
}

impl From<EncodedArray> for Value {
    fn from(v: EncodedArray) -> Self {
        Value::Array(ArrayValue::Encoded(v))
    }
}
