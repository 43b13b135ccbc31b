//! Input nodes: where documents enter an execution tree

use std::fmt;
use std::ops::Bound;

use tracing::{debug, warn};

use super::node::{Direction, Node};
use super::operator::IndexOperator;
use crate::database::{Table, Transaction};
use crate::document::{EncodedDocument, Value, ValueBuffer, ValueType};
use crate::errors::{DbError, DbResult, ErrorCode};
use crate::expr::{EvalContext, Expr, Param};
use crate::index::{Index, IndexRange, OrderedIndex};
use crate::stream::{Control, DocumentIterator, DocumentVisitor, Stream};

/// Full scan of a table in primary key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInputNode {
    table_name: String,
}

impl TableInputNode {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }
}

impl Node for TableInputNode {
    fn to_stream<'tx>(&self, tx: &'tx Transaction<'_>, _params: &[Param]) -> DbResult<Stream<'tx>> {
        let table = tx.get_table(&self.table_name)?;
        Ok(Stream::new(table))
    }
}

impl fmt::Display for TableInputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.table_name)
    }
}

/// Scan of a table through one of its indexes.
///
/// Without a filter the whole index is traversed in `direction`. With one,
/// the filter is evaluated once when the stream is built and `operator`
/// turns the result into a bounded traversal.
#[derive(Debug)]
pub struct IndexInputNode {
    table_name: String,
    index_name: String,
    operator: IndexOperator,
    filter: Option<Box<dyn Expr>>,
    direction: Direction,
}

impl IndexInputNode {
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        operator: IndexOperator,
        filter: Option<Box<dyn Expr>>,
        direction: Direction,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: index_name.into(),
            operator,
            filter,
            direction,
        }
    }

    /// Unfiltered traversal of the whole index
    pub fn full(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self::new(table_name, index_name, IndexOperator::Gte, None, direction)
    }
}

impl Node for IndexInputNode {
    fn to_stream<'tx>(&self, tx: &'tx Transaction<'_>, params: &[Param]) -> DbResult<Stream<'tx>> {
        let table = tx.get_table(&self.table_name)?;
        let index = tx.get_index(&self.index_name)?;
        if index.config().table_name != self.table_name {
            return Err(DbError::not_found(format!(
                "Index {} not found on table {}",
                self.index_name, self.table_name
            )));
        }

        let range = match &self.filter {
            Some(e) => {
                let ctx = EvalContext::new(Some(tx), params);
                widen_range(self.operator.range(&e.eval(&ctx)?)?)?
            }
            None => IndexRange::all(),
        };
        debug!(
            target: "quilldb::tree",
            node = %self,
            range = ?range,
            "index stream built"
        );

        Ok(Stream::new(IndexIterator {
            table,
            index,
            range,
            direction: self.direction,
        }))
    }
}

impl fmt::Display for IndexInputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({}.{}", self.table_name, self.index_name)?;
        if self.filter.is_some() {
            write!(f, " {}", self.operator)?;
        }
        if self.direction.is_reverse() {
            write!(f, ", {}", self.direction)?;
        }
        write!(f, ")")
    }
}

/// Numeric bounds compare as doubles inside the index, so Integer bounds
/// are widened. Array bounds are widened element by element.
fn widen_numeric(v: Value) -> DbResult<Value> {
    match &v {
        Value::Integer(_) => v.convert_to(ValueType::Double),
        Value::Array(arr) => {
            let mut widened = ValueBuffer::new();
            for elem in ValueBuffer::from_array(arr)?.values() {
                widened.push(widen_numeric(elem.clone())?);
            }
            Ok(Value::from(widened))
        }
        _ => Ok(v),
    }
}

fn widen_range(range: IndexRange) -> DbResult<IndexRange> {
    Ok(IndexRange {
        min: widen_bound(range.min)?,
        max: widen_bound(range.max)?,
        band: range.band,
    })
}

fn widen_bound(b: Bound<Value>) -> DbResult<Bound<Value>> {
    Ok(match b {
        Bound::Included(v) => Bound::Included(widen_numeric(v)?),
        Bound::Excluded(v) => Bound::Excluded(widen_numeric(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

/// Yields the documents an index traversal points at.
pub struct IndexIterator<'tx> {
    table: Table<'tx>,
    index: Index<'tx>,
    range: IndexRange,
    direction: Direction,
}

impl IndexIterator<'_> {
    fn fetch(&self, pk: &[u8]) -> DbResult<EncodedDocument> {
        self.table.get_document(pk).map_err(|err| {
            if !err.is(ErrorCode::NotFound) {
                return err;
            }
            warn!(
                target: "quilldb::tree",
                index = self.index.name(),
                table = self.table.name(),
                pk = %hex(pk),
                "index entry points at a missing document"
            );
            DbError::consistency_violation(format!(
                "Index {} references key {} missing from table {}",
                self.index.name(),
                hex(pk),
                self.table.name()
            ))
        })
    }
}

impl DocumentIterator for IndexIterator<'_> {
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        let mut fetch_and_visit = |_: &Value, pk: &[u8]| -> DbResult<Control> {
            let d = self.fetch(pk)?;
            visit(&d)
        };
        self.index
            .iterate_range(&self.range, self.direction.is_reverse(), &mut fetch_and_visit)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{LiteralValue, PositionalParam};

    #[test]
    fn test_node_display() {
        assert_eq!(TableInputNode::new("users").to_string(), "Table(users)");

        let node = IndexInputNode::new(
            "users",
            "idx_age",
            IndexOperator::Gt,
            Some(Box::new(PositionalParam(1))),
            Direction::Desc,
        );
        assert_eq!(node.to_string(), "Index(users.idx_age >, DESC)");

        let full = IndexInputNode::full("users", "idx_age", Direction::Asc);
        assert_eq!(full.to_string(), "Index(users.idx_age)");
    }

    #[test]
    fn test_widen_numeric() {
        assert_eq!(widen_numeric(Value::Integer(2)).unwrap(), Value::Double(2.0));
        assert_eq!(widen_numeric(Value::from("2")).unwrap(), Value::from("2"));
        assert_eq!(
            widen_numeric(Value::duration_nanos(2)).unwrap(),
            Value::duration_nanos(2)
        );

        let pair = Value::from(ValueBuffer::new().with(1i64).with(3.5));
        let widened = widen_numeric(pair).unwrap();
        assert_eq!(
            widened,
            Value::from(ValueBuffer::new().with(1.0).with(3.5))
        );
    }

    #[test]
    fn test_widen_range_keeps_band_and_sides() {
        let range = IndexOperator::Lte.range(&Value::Integer(4)).unwrap();
        let widened = widen_range(range).unwrap();
        assert_eq!(widened.min, Bound::Unbounded);
        assert_eq!(widened.max, Bound::Included(Value::Double(4.0)));
        assert_eq!(widened.band, Some(crate::index::TypeBand::Number));

        let between = IndexOperator::Between
            .range(&Value::from(ValueBuffer::new().with(1i64).with(2i64)))
            .unwrap();
        let widened = widen_range(between).unwrap();
        assert_eq!(widened.min, Bound::Included(Value::Double(1.0)));
        assert_eq!(widened.max, Bound::Included(Value::Double(2.0)));
    }

    #[test]
    fn test_filtered_display_shows_operator() {
        let node = IndexInputNode::new(
            "t",
            "i",
            IndexOperator::Eq,
            Some(Box::new(LiteralValue(Value::Integer(1)))),
            Direction::Asc,
        );
        assert_eq!(node.to_string(), "Index(t.i =)");
    }
}
