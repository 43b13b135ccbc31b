//! Database transactions

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::catalog::{Catalog, TableInfo};
use super::table::Table;
use super::Database;
use crate::document::ValuePath;
use crate::errors::{DbError, DbResult};
use crate::index::{duplicate, index_store_name, Index, IndexConfig, IndexKey};
use crate::storage::EngineTransaction;
use crate::stream::Control;

/// A read-only or read-write transaction.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it
/// back.
pub struct Transaction<'db> {
    db: &'db Database,
    tx: Box<dyn EngineTransaction + 'db>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, tx: Box<dyn EngineTransaction + 'db>) -> Self {
        Self { db, tx }
    }

    pub fn writable(&self) -> bool {
        self.tx.writable()
    }

    fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&*self.tx, self.db.codec())
    }

    /// Creates a table. Fails with `AlreadyExists` if it is already there.
    pub fn create_table(&self, name: &str) -> DbResult<()> {
        if name.is_empty() {
            return Err(DbError::type_mismatch("Table name must not be empty"));
        }
        let catalog = self.catalog();
        if catalog.get_table(name)?.is_some() {
            return Err(DbError::already_exists(format!("Table {} already exists", name)));
        }

        let table = TableInfo::new(name);
        self.tx.create_store(&table.store_name)?;
        catalog.put_table(&table)?;
        info!(target: "quilldb::database", table = name, "table created");
        Ok(())
    }

    /// Creates a table unless one with that name exists.
    pub fn create_table_if_not_exists(&self, name: &str) -> DbResult<()> {
        match self.create_table(name) {
            Err(e) if e.is(crate::errors::ErrorCode::AlreadyExists) => Ok(()),
            other => other,
        }
    }

    /// Resolves a table. Fails with `NotFound` if it does not exist.
    pub fn get_table(&self, name: &str) -> DbResult<Table<'_>> {
        let catalog = self.catalog();
        let table = catalog
            .get_table(name)?
            .ok_or_else(|| DbError::not_found(format!("Table {} not found", name)))?;
        let indexes = catalog.table_indexes(name)?;
        Ok(Table::new(&*self.tx, self.db.codec(), table, indexes))
    }

    /// Creates an index and fills it from the documents already in the table.
    pub fn create_index(&self, config: IndexConfig) -> DbResult<()> {
        let catalog = self.catalog();
        let table = self.get_table(&config.table_name)?;
        if catalog.get_index(&config.index_name)?.is_some() {
            return Err(DbError::already_exists(format!(
                "Index {} already exists",
                config.index_name
            )));
        }
        let path = ValuePath::parse(&config.path)?;

        // collected first: the engine does not allow writes during a scan
        let mut entries = Vec::new();
        table.scan(&mut |pk, d| {
            if let Some(value) = path.get_value(d)? {
                entries.push((value, pk.to_vec()));
            }
            Ok(Control::Continue)
        })?;

        if config.unique {
            let mut seen = BTreeSet::new();
            for (value, _) in entries.iter().filter(|(v, _)| !v.is_null()) {
                if !seen.insert(IndexKey::from_value(value)?) {
                    return Err(duplicate(value, &config.index_name));
                }
            }
        }

        self.tx.create_store(&index_store_name(&config.index_name))?;
        catalog.put_index(&config)?;

        let index = Index::new(&*self.tx, self.db.codec(), config);
        for (value, pk) in &entries {
            index.put_entry(value, pk)?;
        }
        info!(
            target: "quilldb::database",
            index = index.name(),
            table = %index.config().table_name,
            entries = entries.len(),
            "index created"
        );
        Ok(())
    }

    /// Resolves an index. Fails with `NotFound` if it does not exist.
    pub fn get_index(&self, name: &str) -> DbResult<Index<'_>> {
        let config = self
            .catalog()
            .get_index(name)?
            .ok_or_else(|| DbError::not_found(format!("Index {} not found", name)))?;
        Ok(Index::new(&*self.tx, self.db.codec(), config))
    }

    /// Table names in sorted order
    pub fn list_tables(&self) -> DbResult<Vec<String>> {
        Ok(self
            .catalog()
            .list_tables()?
            .into_iter()
            .map(|t| t.name)
            .collect())
    }

    /// Index definitions sorted by name, optionally only those of `table`
    pub fn list_indexes(&self, table: Option<&str>) -> DbResult<Vec<IndexConfig>> {
        let catalog = self.catalog();
        match table {
            Some(t) => catalog.table_indexes(t),
            None => catalog.list_indexes(),
        }
    }

    pub fn commit(self) -> DbResult<()> {
        debug!(target: "quilldb::database", writable = self.tx.writable(), "commit");
        self.tx.commit()
    }

    pub fn rollback(self) -> DbResult<()> {
        debug!(target: "quilldb::database", "rollback");
        self.tx.rollback()
    }
}
