//! Index traversal strategies

use std::fmt;
use std::ops::Bound;

use crate::document::{Array, Value};
use crate::errors::{DbError, DbResult};
use crate::index::{IndexRange, TypeBand};

/// How a bound value narrows an index traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOperator {
    /// `= v`
    Eq,
    /// `> v`
    Gt,
    /// `>= v`
    Gte,
    /// `< v`
    Lt,
    /// `<= v`
    Lte,
    /// `BETWEEN lo AND hi`, bound is the array `[lo, hi]`
    Between,
}

impl IndexOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            IndexOperator::Eq => "=",
            IndexOperator::Gt => ">",
            IndexOperator::Gte => ">=",
            IndexOperator::Lt => "<",
            IndexOperator::Lte => "<=",
            IndexOperator::Between => "BETWEEN",
        }
    }

    /// The value interval selected by `bound`.
    ///
    /// One-sided operators stay inside the band of `bound`, so `> 2` never
    /// reaches Text entries.
    pub fn range(&self, bound: &Value) -> DbResult<IndexRange> {
        let band = Some(TypeBand::of(bound));
        let v = || bound.clone();
        let range = match self {
            IndexOperator::Eq => IndexRange {
                min: Bound::Included(v()),
                max: Bound::Included(v()),
                band,
            },
            IndexOperator::Gt => IndexRange {
                min: Bound::Excluded(v()),
                max: Bound::Unbounded,
                band,
            },
            IndexOperator::Gte => IndexRange {
                min: Bound::Included(v()),
                max: Bound::Unbounded,
                band,
            },
            IndexOperator::Lt => IndexRange {
                min: Bound::Unbounded,
                max: Bound::Excluded(v()),
                band,
            },
            IndexOperator::Lte => IndexRange {
                min: Bound::Unbounded,
                max: Bound::Included(v()),
                band,
            },
            IndexOperator::Between => {
                let (lo, hi) = between_bounds(bound)?;
                IndexRange {
                    min: Bound::Included(lo),
                    max: Bound::Included(hi),
                    band: None,
                }
            }
        };
        Ok(range)
    }
}

impl fmt::Display for IndexOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn between_bounds(bound: &Value) -> DbResult<(Value, Value)> {
    let arr = bound.as_array().ok_or_else(|| {
        DbError::type_mismatch(format!(
            "BETWEEN expects an array [lo, hi], got {}",
            bound.value_type()
        ))
    })?;
    match (arr.get_by_index(0)?, arr.get_by_index(1)?, arr.get_by_index(2)?) {
        (Some(lo), Some(hi), None) => Ok((lo, hi)),
        _ => Err(DbError::type_mismatch(
            "BETWEEN expects exactly two bounds",
        )),
    }
}
