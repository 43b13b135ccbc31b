//! Dotted value paths (`address.city`, `tags.0`)

use std::fmt;

use super::value::Value;
use super::{Array, Document};
use crate::errors::{DbError, DbResult};

/// A path into nested documents and arrays.
///
/// Numeric segments index arrays; on documents every segment is a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    segments: Vec<String>,
}

impl ValuePath {
    /// Parses a dotted path. Empty segments are rejected.
    pub fn parse(path: &str) -> DbResult<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DbError::type_mismatch(format!("invalid path '{}'", path)));
        }
        Ok(Self { segments })
    }

    /// Returns the segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against `d`. Returns `None` if any step is missing.
    pub fn get_value(&self, d: &dyn Document) -> DbResult<Option<Value>> {
        let (first, rest) = match self.segments.split_first() {
            Some(split) => split,
            None => return Ok(None),
        };

        let mut current = match d.get_by_field(first)? {
            Some(v) => v,
            None => return Ok(None),
        };

        for segment in rest {
            let next = match &current {
                Value::Document(doc) => doc.get_by_field(segment)?,
                Value::Array(arr) => match segment.parse::<usize>() {
                    Ok(i) => arr.get_by_index(i)?,
                    Err(_) => None,
                },
                _ => None,
            };
            current = match next {
                Some(v) => v,
                None => return Ok(None),
            };
        }

        Ok(Some(current))
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FieldBuffer, ValueBuffer};

    fn sample() -> FieldBuffer {
        FieldBuffer::new()
            .with("name", "ada")
            .with("address", FieldBuffer::new().with("city", "London"))
            .with("tags", ValueBuffer::new().with("x").with("y"))
    }

    #[test]
    fn test_nested_field() {
        let path = ValuePath::parse("address.city").unwrap();
        assert_eq!(path.get_value(&sample()).unwrap(), Some(Value::from("London")));
    }

    #[test]
    fn test_array_index() {
        let path = ValuePath::parse("tags.1").unwrap();
        assert_eq!(path.get_value(&sample()).unwrap(), Some(Value::from("y")));
    }

    #[test]
    fn test_missing_step() {
        let path = ValuePath::parse("name.first").unwrap();
        assert_eq!(path.get_value(&sample()).unwrap(), None);
        let path = ValuePath::parse("tags.9").unwrap();
        assert_eq!(path.get_value(&sample()).unwrap(), None);
    }

    #[test]
    fn test_invalid_path() {
        assert!(ValuePath::parse("a..b").is_err());
        assert!(ValuePath::parse("").is_err());
    }
}
