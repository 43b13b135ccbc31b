//! JSON rendering of values and documents

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number};

use super::value::Value;
use super::{Array, Document};
use crate::errors::DbResult;
use crate::stream::Control;

/// Renders a document as a JSON object, keeping field order.
pub fn to_json(d: &dyn Document) -> DbResult<serde_json::Value> {
    let mut map = Map::new();
    d.iterate(&mut |field, value| {
        map.insert(field.to_string(), value_to_json(value)?);
        Ok(Control::Continue)
    })?;
    Ok(serde_json::Value::Object(map))
}

pub(crate) fn value_to_json(v: &Value) -> DbResult<serde_json::Value> {
    Ok(match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Double(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::String(STANDARD.encode(b)),
        Value::Duration(d) => match d.num_nanoseconds() {
            Some(n) => serde_json::Value::Number(n.into()),
            None => serde_json::Value::String(d.to_string()),
        },
        Value::Document(d) => to_json(d)?,
        Value::Array(a) => {
            let mut items = Vec::new();
            a.iterate(&mut |_, value| {
                items.push(value_to_json(value)?);
                Ok(Control::Continue)
            })?;
            serde_json::Value::Array(items)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FieldBuffer, ValueBuffer};
    use serde_json::json;

    #[test]
    fn test_document_to_json() {
        let fb = FieldBuffer::new()
            .with("a", 1i64)
            .with("b", 2.5)
            .with("c", ValueBuffer::new().with(true).with(Value::Null))
            .with("d", Value::Blob(vec![1, 2, 3]))
            .with("e", Value::duration_nanos(1500));

        let j = to_json(&fb).unwrap();
        assert_eq!(
            j,
            json!({"a": 1, "b": 2.5, "c": [true, null], "d": "AQID", "e": 1500})
        );
    }

    #[test]
    fn test_display_uses_json() {
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::Double(f64::NAN).to_string(), "null");
    }
}
