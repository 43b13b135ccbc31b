//! Database handle, transactions and tables
//!
//! A [`Database`] owns an [`Engine`] and the [`Codec`] shared by every table
//! and index. All reads and writes go through a [`Transaction`].
//!
//! # Invariants
//!
//! - Table and index definitions live in the catalog store of the same engine
//! - Index entries are written in the same transaction as the document
//! - A table scan yields documents in primary key order

mod catalog;
mod table;
mod transaction;

pub use catalog::TableInfo;
pub use table::Table;
pub use transaction::Transaction;

use tracing::{info, warn};

use crate::codec::Codec;
use crate::config::DatabaseConfig;
use crate::errors::DbResult;
use crate::storage::{Engine, MemoryEngine};

use catalog::Catalog;

/// An open database.
pub struct Database {
    engine: Box<dyn Engine>,
    codec: Codec,
    config: DatabaseConfig,
}

impl Database {
    /// Opens a database over `engine`, creating the catalog on first use.
    pub fn open(engine: impl Engine + 'static, config: DatabaseConfig) -> DbResult<Self> {
        let db = Self {
            engine: Box::new(engine),
            codec: Codec::with_config(&config),
            config,
        };

        let tx = db.engine.begin(true)?;
        let created = Catalog::new(&*tx, &db.codec).bootstrap()?;
        tx.commit()?;
        info!(target: "quilldb::database", fresh = created, "database opened");
        Ok(db)
    }

    /// Opens an empty in-memory database with default settings.
    pub fn new() -> DbResult<Self> {
        Self::open(MemoryEngine::new(), DatabaseConfig::default())
    }

    pub fn begin(&self, writable: bool) -> DbResult<Transaction<'_>> {
        Ok(Transaction::new(self, self.engine.begin(writable)?))
    }

    /// Runs `f` in a read-only transaction.
    pub fn view<R>(&self, f: impl FnOnce(&Transaction<'_>) -> DbResult<R>) -> DbResult<R> {
        let tx = self.begin(false)?;
        let result = f(&tx);
        tx.rollback()?;
        result
    }

    /// Runs `f` in a read-write transaction, committing if it returns `Ok`.
    pub fn update<R>(&self, f: impl FnOnce(&Transaction<'_>) -> DbResult<R>) -> DbResult<R> {
        let tx = self.begin(true)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(target: "quilldb::database", error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldBuffer, Value};
    use crate::errors::{DbError, ErrorCode};
    use crate::index::IndexConfig;
    use crate::stream::Control;

    #[test]
    fn test_insert_and_fetch() {
        let db = Database::new().unwrap();
        let pk = db
            .update(|tx| {
                tx.create_table("users")?;
                tx.get_table("users")?
                    .insert(&FieldBuffer::new().with("name", "ada"))
            })
            .unwrap();
        assert_eq!(pk, 1u64.to_be_bytes().to_vec());

        db.view(|tx| {
            let d = tx.get_table("users")?.get_document(&pk)?;
            assert_eq!(d.get_by_field("name")?, Some(Value::from("ada")));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_scan_in_insertion_order() {
        let db = Database::new().unwrap();
        db.update(|tx| {
            tx.create_table("t")?;
            let t = tx.get_table("t")?;
            for i in 0..5i64 {
                t.insert(&FieldBuffer::new().with("i", i))?;
            }
            Ok(())
        })
        .unwrap();

        let mut seen = Vec::new();
        db.view(|tx| {
            tx.get_table("t")?.scan(&mut |_, d| {
                seen.push(d.get_by_field("i")?.and_then(|v| v.as_integer()));
                Ok(Control::Continue)
            })
        })
        .unwrap();
        assert_eq!(seen, (0..5).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_table_and_document() {
        let db = Database::new().unwrap();
        let err = db.view(|tx| tx.get_table("nope").map(|_| ())).unwrap_err();
        assert!(err.is(ErrorCode::NotFound));

        db.update(|tx| tx.create_table("t")).unwrap();
        let err = db
            .view(|tx| tx.get_table("t")?.get_document(b"missing").map(|_| ()))
            .unwrap_err();
        assert!(err.is(ErrorCode::NotFound));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let db = Database::new().unwrap();
        let err = db
            .update(|tx| {
                tx.create_table("t")?;
                let t = tx.get_table("t")?;
                t.insert_with_key(b"k", &FieldBuffer::new())?;
                t.insert_with_key(b"k", &FieldBuffer::new())
            })
            .unwrap_err();
        assert!(err.is(ErrorCode::AlreadyExists));
    }

    #[test]
    fn test_index_maintained_on_delete() {
        let db = Database::new().unwrap();
        db.update(|tx| {
            tx.create_table("t")?;
            tx.create_index(IndexConfig::new("idx_a", "t", "a").unique())?;
            let t = tx.get_table("t")?;
            let pk = t.insert(&FieldBuffer::new().with("a", 1i64))?;
            t.delete(&pk)?;
            // the freed unique value can be reused
            t.insert(&FieldBuffer::new().with("a", 1i64))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let db = Database::new().unwrap();
        let result: DbResult<()> = db.update(|tx| {
            tx.create_table("t")?;
            Err(DbError::eval("abort"))
        });
        assert!(result.is_err());
        assert!(db.view(|tx| tx.list_tables()).unwrap().is_empty());
    }
}
