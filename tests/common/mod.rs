//! Shared test fixtures

#![allow(dead_code)]

use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quilldb::database::Database;
use quilldb::document::{Document, FieldBuffer, Value};
use quilldb::errors::DbResult;
use quilldb::index::IndexConfig;
use quilldb::storage::{Engine, EngineTransaction, KvVisitor, MemoryEngine};
use quilldb::stream::{Control, Stream};
use quilldb::config::DatabaseConfig;

/// Engine wrapper counting point lookups on one store.
pub struct CountingEngine {
    inner: MemoryEngine,
    store: String,
    gets: Arc<AtomicUsize>,
}

impl CountingEngine {
    pub fn new(store: &str, gets: Arc<AtomicUsize>) -> Self {
        Self {
            inner: MemoryEngine::new(),
            store: store.to_string(),
            gets,
        }
    }
}

impl Engine for CountingEngine {
    fn begin(&self, writable: bool) -> DbResult<Box<dyn EngineTransaction + '_>> {
        Ok(Box::new(CountingTransaction {
            inner: self.inner.begin(writable)?,
            store: &self.store,
            gets: &self.gets,
        }))
    }
}

struct CountingTransaction<'e> {
    inner: Box<dyn EngineTransaction + 'e>,
    store: &'e str,
    gets: &'e AtomicUsize,
}

impl EngineTransaction for CountingTransaction<'_> {
    fn writable(&self) -> bool {
        self.inner.writable()
    }

    fn create_store(&self, name: &str) -> DbResult<()> {
        self.inner.create_store(name)
    }

    fn drop_store(&self, name: &str) -> DbResult<()> {
        self.inner.drop_store(name)
    }

    fn has_store(&self, name: &str) -> DbResult<bool> {
        self.inner.has_store(name)
    }

    fn get(&self, store: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        if store == self.store {
            self.gets.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.get(store, key)
    }

    fn put(&self, store: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.inner.put(store, key, value)
    }

    fn delete(&self, store: &str, key: &[u8]) -> DbResult<bool> {
        self.inner.delete(store, key)
    }

    fn range(
        &self,
        store: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        reverse: bool,
        visit: &mut KvVisitor<'_>,
    ) -> DbResult<()> {
        self.inner.range(store, lower, upper, reverse, visit)
    }

    fn commit(self: Box<Self>) -> DbResult<()> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> DbResult<()> {
        self.inner.rollback()
    }
}

/// Opens a database over a counting engine watching table `table`.
pub fn counting_db(table: &str) -> (Database, Arc<AtomicUsize>) {
    let gets = Arc::new(AtomicUsize::new(0));
    let engine = CountingEngine::new(&format!("t_{}", table), Arc::clone(&gets));
    let db = Database::open(engine, DatabaseConfig::default()).unwrap();
    (db, gets)
}

/// Creates table `table` with index `index` on field `field` and inserts
/// one document `{field: v}` per value.
pub fn seed(db: &Database, table: &str, index: &str, field: &str, values: &[Value]) {
    db.update(|tx| {
        tx.create_table(table)?;
        tx.create_index(IndexConfig::new(index, table, field))?;
        let t = tx.get_table(table)?;
        for v in values {
            t.insert(&FieldBuffer::new().with(field, v.clone()))?;
        }
        Ok(())
    })
    .unwrap();
}

/// Collects the value of `field` from every document of the stream.
pub fn field_values(stream: &Stream<'_>, field: &str) -> DbResult<Vec<Value>> {
    let mut out = Vec::new();
    stream.iterate(&mut |d| {
        out.push(d.get_by_field(field)?.unwrap_or(Value::Null));
        Ok(Control::Continue)
    })?;
    Ok(out)
}

pub fn doubles(values: &[f64]) -> Vec<Value> {
    values.iter().map(|v| Value::Double(*v)).collect()
}

pub fn as_document(d: &dyn Document) -> FieldBuffer {
    FieldBuffer::from_document(d).unwrap()
}
