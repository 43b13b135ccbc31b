//! Materialized documents and arrays

use super::value::Value;
use super::{Array, Document};
use crate::errors::DbResult;
use crate::stream::Control;

/// An in-memory document: an ordered list of fields.
///
/// Field names are unique; [`FieldBuffer::set`] replaces in place and keeps
/// the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBuffer {
    fields: Vec<(String, Value)>,
}

impl FieldBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Copies every field of `d` into a new buffer.
    ///
    /// Nested containers are not decoded; they stay as cheap handles.
    pub fn from_document(d: &dyn Document) -> DbResult<Self> {
        let mut fb = FieldBuffer::new();
        d.iterate(&mut |field, value| {
            fb.fields.push((field.to_string(), value.clone()));
            Ok(Control::Continue)
        })?;
        Ok(fb)
    }

    /// Appends a field without checking for duplicates.
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Builder-style [`FieldBuffer::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Replaces the field if present, appends it otherwise.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Removes a field, returning its value.
    pub fn delete(&mut self, field: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(f, _)| f == field)?;
        Some(self.fields.remove(pos).1)
    }

    /// Returns a field by name without copying.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Returns the number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns fields in order
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl Document for FieldBuffer {
    fn iterate(&self, visit: &mut dyn FnMut(&str, &Value) -> DbResult<Control>) -> DbResult<()> {
        for (field, value) in &self.fields {
            if visit(field, value)? == Control::Stop {
                break;
            }
        }
        Ok(())
    }

    fn get_by_field(&self, field: &str) -> DbResult<Option<Value>> {
        Ok(self.get(field).cloned())
    }

    fn exact_len(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}

/// An in-memory array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBuffer {
    values: Vec<Value>,
}

impl ValueBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Copies every element of `a` into a new buffer.
    pub fn from_array(a: &dyn Array) -> DbResult<Self> {
        let mut vb = ValueBuffer::new();
        a.iterate(&mut |_, value| {
            vb.values.push(value.clone());
            Ok(Control::Continue)
        })?;
        Ok(vb)
    }

    /// Appends a value
    pub fn push(&mut self, value: impl Into<Value>) -> &mut Self {
        self.values.push(value.into());
        self
    }

    /// Builder-style push
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Returns the number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns elements in order
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for ValueBuffer {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl Array for ValueBuffer {
    fn iterate(&self, visit: &mut dyn FnMut(usize, &Value) -> DbResult<Control>) -> DbResult<()> {
        for (i, value) in self.values.iter().enumerate() {
            if visit(i, value)? == Control::Stop {
                break;
            }
        }
        Ok(())
    }

    fn get_by_index(&self, index: usize) -> DbResult<Option<Value>> {
        Ok(self.values.get(index).cloned())
    }

    fn exact_len(&self) -> Option<usize> {
        Some(self.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut fb = FieldBuffer::new();
        fb.add("z", 1i64).add("a", 2i64).add("m", 3i64);

        let mut names = Vec::new();
        fb.iterate(&mut |f, _| {
            names.push(f.to_string());
            Ok(Control::Continue)
        })
        .unwrap();

        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut fb = FieldBuffer::new().with("a", 1i64).with("b", 2i64);
        fb.set("a", "one");

        assert_eq!(fb.len(), 2);
        assert_eq!(fb.fields()[0].0, "a");
        assert_eq!(fb.get("a"), Some(&Value::Text("one".into())));
    }

    #[test]
    fn test_delete_field() {
        let mut fb = FieldBuffer::new().with("a", 1i64).with("b", 2i64);
        assert_eq!(fb.delete("a"), Some(Value::Integer(1)));
        assert_eq!(fb.delete("a"), None);
        assert_eq!(fb.len(), 1);
    }

    #[test]
    fn test_stop_ends_iteration() {
        let vb = ValueBuffer::new().with(1i64).with(2i64).with(3i64);
        let mut seen = 0;
        vb.iterate(&mut |_, _| {
            seen += 1;
            Ok(Control::Stop)
        })
        .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_get_by_index_out_of_range() {
        let vb = ValueBuffer::new().with(true);
        assert_eq!(vb.get_by_index(0).unwrap(), Some(Value::Bool(true)));
        assert_eq!(vb.get_by_index(1).unwrap(), None);
    }
}
