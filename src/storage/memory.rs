//! In-memory engine
//!
//! Committed state is an immutable snapshot behind an `Arc`. A transaction
//! reads from the snapshot it started on and copies it on first write.
//! Commit publishes the copy only if no other writer committed in between.

use std::cell::{RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{Engine, EngineTransaction, KvVisitor, StorageError};
use crate::errors::DbResult;
use crate::stream::Control;

type Store = BTreeMap<Vec<u8>, Vec<u8>>;
type StoreMap = BTreeMap<String, Store>;

/// A transactional engine held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: RwLock<Arc<StoreMap>>,
}

impl MemoryEngine {
    /// Creates an empty engine
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MemoryEngine {
    fn begin(&self, writable: bool) -> DbResult<Box<dyn EngineTransaction + '_>> {
        let base = Arc::clone(&self.state.read());
        Ok(Box::new(MemoryTransaction {
            engine: self,
            base,
            working: RefCell::new(None),
            writable,
        }))
    }
}

struct MemoryTransaction<'e> {
    engine: &'e MemoryEngine,
    base: Arc<StoreMap>,
    working: RefCell<Option<StoreMap>>,
    writable: bool,
}

impl MemoryTransaction<'_> {
    fn read<R>(&self, store: &str, f: impl FnOnce(&Store) -> DbResult<R>) -> DbResult<R> {
        let guard = self
            .working
            .try_borrow()
            .map_err(|_| StorageError::Busy(store.to_string()))?;
        let stores = guard.as_ref().unwrap_or(&*self.base);
        let s = stores
            .get(store)
            .ok_or_else(|| StorageError::StoreNotFound(store.to_string()))?;
        f(s)
    }

    fn stores_mut(&self, store: &str) -> DbResult<RefMut<'_, StoreMap>> {
        if !self.writable {
            return Err(StorageError::ReadOnly.into());
        }
        let guard = self
            .working
            .try_borrow_mut()
            .map_err(|_| StorageError::Busy(store.to_string()))?;
        let base = &self.base;
        Ok(RefMut::map(guard, |w| w.get_or_insert_with(|| (**base).clone())))
    }

    fn store_mut(&self, store: &str) -> DbResult<RefMut<'_, Store>> {
        let stores = self.stores_mut(store)?;
        if !stores.contains_key(store) {
            return Err(StorageError::StoreNotFound(store.to_string()).into());
        }
        Ok(RefMut::map(stores, |s| s.entry(store.to_string()).or_default()))
    }
}

impl EngineTransaction for MemoryTransaction<'_> {
    fn writable(&self) -> bool {
        self.writable
    }

    fn create_store(&self, name: &str) -> DbResult<()> {
        let mut stores = self.stores_mut(name)?;
        if stores.contains_key(name) {
            return Err(StorageError::StoreAlreadyExists(name.to_string()).into());
        }
        stores.insert(name.to_string(), Store::new());
        Ok(())
    }

    fn drop_store(&self, name: &str) -> DbResult<()> {
        let mut stores = self.stores_mut(name)?;
        stores
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::StoreNotFound(name.to_string()).into())
    }

    fn has_store(&self, name: &str) -> DbResult<bool> {
        let guard = self
            .working
            .try_borrow()
            .map_err(|_| StorageError::Busy(name.to_string()))?;
        Ok(guard.as_ref().unwrap_or(&*self.base).contains_key(name))
    }

    fn get(&self, store: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.read(store, |s| Ok(s.get(key).cloned()))
    }

    fn put(&self, store: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.store_mut(store)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, store: &str, key: &[u8]) -> DbResult<bool> {
        Ok(self.store_mut(store)?.remove(key).is_some())
    }

    fn range(
        &self,
        store: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut KvVisitor<'_>,
    ) -> DbResult<()> {
        self.read(store, |s| {
            if is_empty_range(lower, upper) {
                return Ok(());
            }
            let entries = s.range::<[u8], _>((lower, upper));
            if reverse {
                for (k, v) in entries.rev() {
                    if visit(k, v)? == Control::Stop {
                        break;
                    }
                }
            } else {
                for (k, v) in entries {
                    if visit(k, v)? == Control::Stop {
                        break;
                    }
                }
            }
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryTransaction {
            engine,
            base,
            working,
            writable,
        } = *self;
        let working = match working.into_inner() {
            Some(w) if writable => w,
            _ => return Ok(()),
        };

        let mut state = engine.state.write();
        if !Arc::ptr_eq(&state, &base) {
            warn!(
                target: "quilldb::storage",
                "commit rejected: another transaction committed first"
            );
            return Err(StorageError::Conflict("state changed since begin".into()).into());
        }
        *state = Arc::new(working);
        debug!(target: "quilldb::storage", stores = state.len(), "transaction committed");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> DbResult<()> {
        debug!(target: "quilldb::storage", "transaction rolled back");
        Ok(())
    }
}

/// `BTreeMap::range` panics on these, so they are filtered first.
fn is_empty_range(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    let (lo, lo_excluded) = match lower {
        Bound::Included(k) => (k, false),
        Bound::Excluded(k) => (k, true),
        Bound::Unbounded => return false,
    };
    let (hi, hi_excluded) = match upper {
        Bound::Included(k) => (k, false),
        Bound::Excluded(k) => (k, true),
        Bound::Unbounded => return false,
    };
    match lo.cmp(hi) {
        Ordering::Greater => true,
        Ordering::Equal => lo_excluded || hi_excluded,
        Ordering::Less => false,
    }
}
