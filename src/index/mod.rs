//! Ordered secondary indexes
//!
//! An index maps the value found at a document path to the primary keys of
//! the documents holding it. Entries live in their own engine store, keyed by
//! [`IndexKey`] bytes followed by the primary key, so an engine range scan is
//! an ordered index traversal.
//!
//! # Invariants
//!
//! - Traversal order is total and stable for one committed state
//! - A visitor returning `Control::Stop` ends the traversal successfully
//! - One-sided ranges built by operators never cross their value's type band

mod keys;
mod kv;

pub use keys::{IndexKey, TypeBand};
pub(crate) use kv::duplicate;
pub use kv::{index_store_name, Index};

use std::ops::Bound;

use crate::document::Value;
use crate::errors::DbResult;
use crate::storage::prefix_successor;
use crate::stream::Control;

/// Visitor over `(indexed value, primary key)` pairs
pub type IndexVisitor<'v> = dyn FnMut(&Value, &[u8]) -> DbResult<Control> + 'v;

/// Index definition as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Index name, unique across the database
    pub index_name: String,
    /// Table the index belongs to
    pub table_name: String,
    /// Dotted path of the indexed value
    pub path: String,
    /// Reject a second document with an equal non-null value
    pub unique: bool,
}

impl IndexConfig {
    /// Create a non-unique index definition
    pub fn new(
        index_name: impl Into<String>,
        table_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            table_name: table_name.into(),
            path: path.into(),
            unique: false,
        }
    }

    /// Builder-style unique flag
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A value interval to traverse.
///
/// When `band` is set, unbounded sides stop at the edges of that type band
/// instead of at the ends of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRange {
    pub min: Bound<Value>,
    pub max: Bound<Value>,
    pub band: Option<TypeBand>,
}

impl IndexRange {
    /// The whole index
    pub fn all() -> Self {
        Self {
            min: Bound::Unbounded,
            max: Bound::Unbounded,
            band: None,
        }
    }

    /// Converts the value interval into engine key bounds.
    ///
    /// Returns `None` when the interval can hold no key.
    pub fn key_bounds(&self) -> DbResult<Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)>> {
        let lower = match &self.min {
            Bound::Included(v) => Bound::Included(IndexKey::from_value(v)?),
            Bound::Excluded(v) => match prefix_successor(&IndexKey::from_value(v)?) {
                Some(k) => Bound::Included(k),
                None => return Ok(None),
            },
            Bound::Unbounded => match self.band {
                Some(band) => Bound::Included(vec![band.prefix()]),
                None => Bound::Unbounded,
            },
        };

        let upper = match &self.max {
            Bound::Included(v) => match prefix_successor(&IndexKey::from_value(v)?) {
                Some(k) => Bound::Excluded(k),
                None => Bound::Unbounded,
            },
            Bound::Excluded(v) => Bound::Excluded(IndexKey::from_value(v)?),
            Bound::Unbounded => match self.band {
                Some(band) => Bound::Excluded(vec![band.prefix() + 1]),
                None => Bound::Unbounded,
            },
        };

        Ok(Some((lower, upper)))
    }
}

/// Ordered traversal over `(value, primary key)` pairs.
pub trait OrderedIndex {
    /// Visits every pair inside `range`, descending when `reverse` is set.
    fn iterate_range(
        &self,
        range: &IndexRange,
        reverse: bool,
        visit: &mut IndexVisitor<'_>,
    ) -> DbResult<()>;

    /// Visits pairs with value `>= pivot` in ascending order; `None` starts at
    /// the smallest key.
    fn ascend_greater_or_equal(
        &self,
        pivot: Option<&Value>,
        visit: &mut IndexVisitor<'_>,
    ) -> DbResult<()> {
        let range = IndexRange {
            min: pivot.map_or(Bound::Unbounded, |v| Bound::Included(v.clone())),
            ..IndexRange::all()
        };
        self.iterate_range(&range, false, visit)
    }

    /// Visits pairs with value `<= pivot` in descending order; `None` starts at
    /// the largest key.
    fn descend_less_or_equal(
        &self,
        pivot: Option<&Value>,
        visit: &mut IndexVisitor<'_>,
    ) -> DbResult<()> {
        let range = IndexRange {
            max: pivot.map_or(Bound::Unbounded, |v| Bound::Included(v.clone())),
            ..IndexRange::all()
        };
        self.iterate_range(&range, true, visit)
    }
}
