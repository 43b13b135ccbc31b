//! Document model for quilldb
//!
//! Everything the database stores is a [`Value`]. Documents and arrays come
//! in two flavours that share one iteration contract:
//!
//! - materialized: [`FieldBuffer`] / [`ValueBuffer`], held in memory
//! - encoded: [`EncodedDocument`] / [`EncodedArray`], raw bytes decoded on access
//!
//! # Invariants
//!
//! - Document iteration order is insertion/encoding order
//! - A malformed encoded container fails on access, never on construction
//! - Integer and Duration are distinct tags and never collapse into each other

mod buffer;
mod compare;
mod json;
mod path;
mod value;

pub use buffer::{FieldBuffer, ValueBuffer};
pub use json::to_json;
pub use path::ValuePath;
pub use value::{ArrayValue, DocumentValue, Value, ValueType};

pub use crate::codec::{EncodedArray, EncodedDocument};

use crate::errors::DbResult;
use crate::stream::Control;

/// An ordered mapping from field name to value.
pub trait Document {
    /// Calls `visit` once per field, in order, until it returns
    /// [`Control::Stop`] or an error.
    fn iterate(&self, visit: &mut dyn FnMut(&str, &Value) -> DbResult<Control>) -> DbResult<()>;

    /// Returns the value of the first field named `field`.
    fn get_by_field(&self, field: &str) -> DbResult<Option<Value>>;

    /// Number of fields, when the representation knows it exactly and cheaply.
    fn exact_len(&self) -> Option<usize> {
        None
    }
}

/// An ordered sequence of values addressable by position.
pub trait Array {
    /// Calls `visit` once per element, in order.
    fn iterate(&self, visit: &mut dyn FnMut(usize, &Value) -> DbResult<Control>) -> DbResult<()>;

    /// Returns the element at `index`.
    fn get_by_index(&self, index: usize) -> DbResult<Option<Value>>;

    /// Number of elements, when known exactly and cheaply.
    fn exact_len(&self) -> Option<usize> {
        None
    }
}

/// Returns the number of fields in `d`, iterating it if needed.
pub fn length(d: &dyn Document) -> DbResult<usize> {
    if let Some(n) = d.exact_len() {
        return Ok(n);
    }
    let mut n = 0;
    d.iterate(&mut |_, _| {
        n += 1;
        Ok(Control::Continue)
    })?;
    Ok(n)
}

/// Returns the number of elements in `a`, iterating it if needed.
pub fn array_length(a: &dyn Array) -> DbResult<usize> {
    if let Some(n) = a.exact_len() {
        return Ok(n);
    }
    let mut n = 0;
    a.iterate(&mut |_, _| {
        n += 1;
        Ok(Control::Continue)
    })?;
    Ok(n)
}
