//! Key/value storage engine
//!
//! The database sits on top of an [`Engine`]: a set of named stores, each an
//! ordered map from byte keys to byte values, accessed through transactions.
//!
//! # Invariants
//!
//! - Keys within a store iterate in lexicographic byte order
//! - Writes in a transaction are invisible to others until commit
//! - A dropped transaction that was never committed is rolled back

mod errors;
mod memory;

pub use errors::StorageError;
pub use memory::MemoryEngine;

use std::ops::Bound;

use crate::errors::DbResult;
use crate::stream::Control;

/// Visitor over raw key/value pairs
pub type KvVisitor<'v> = dyn FnMut(&[u8], &[u8]) -> DbResult<Control> + 'v;

/// A transactional key/value engine.
pub trait Engine: Send + Sync {
    /// Starts a transaction. Writes require `writable`.
    fn begin(&self, writable: bool) -> DbResult<Box<dyn EngineTransaction + '_>>;
}

/// One engine transaction.
pub trait EngineTransaction {
    /// Returns whether the transaction accepts writes
    fn writable(&self) -> bool;

    /// Creates an empty store
    fn create_store(&self, name: &str) -> DbResult<()>;

    /// Drops a store and everything in it
    fn drop_store(&self, name: &str) -> DbResult<()>;

    /// Returns whether a store exists
    fn has_store(&self, name: &str) -> DbResult<bool>;

    /// Point lookup
    fn get(&self, store: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Inserts or replaces a key
    fn put(&self, store: &str, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Removes a key, returning whether it existed
    fn delete(&self, store: &str, key: &[u8]) -> DbResult<bool>;

    /// Visits keys within `lower..upper`, ascending or descending.
    ///
    /// An empty or inverted range visits nothing. `visit` must not write to
    /// `store`.
    fn range(
        &self,
        store: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut KvVisitor<'_>,
    ) -> DbResult<()>;

    /// Makes the writes visible
    fn commit(self: Box<Self>) -> DbResult<()>;

    /// Discards the writes
    fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Returns the smallest key greater than every key starting with `prefix`,
/// or `None` if `prefix` is all `0xFF`.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xFF {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_successor(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
        assert_eq!(prefix_successor(&[]), None);
    }
}
