//! Plan nodes

use std::fmt;

use crate::database::Transaction;
use crate::errors::DbResult;
use crate::expr::Param;
use crate::stream::Stream;

/// A node of an execution tree that produces documents.
pub trait Node: fmt::Display {
    /// Builds the stream of documents this node yields within `tx`.
    fn to_stream<'tx>(&self, tx: &'tx Transaction<'_>, params: &[Param]) -> DbResult<Stream<'tx>>;
}

/// Ordering direction of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_reverse(&self) -> bool {
        *self == Direction::Desc
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}
