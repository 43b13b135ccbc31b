//! Execution tree
//!
//! Input nodes turn a table or an index into a [`Stream`](crate::stream::Stream).
//! Bounds from filter expressions are resolved when the stream is built,
//! never per document.

mod input;
mod node;
mod operator;

pub use input::{IndexInputNode, IndexIterator, TableInputNode};
pub use node::{Direction, Node};
pub use operator::IndexOperator;
