//! Tables: documents keyed by primary key

use std::ops::Bound;

use bytes::Bytes;
use tracing::trace;

use super::catalog::{Catalog, TableInfo};
use crate::codec::Codec;
use crate::document::{Document, EncodedDocument, ValuePath};
use crate::errors::{DbError, DbResult};
use crate::index::{Index, IndexConfig};
use crate::storage::EngineTransaction;
use crate::stream::{Control, DocumentIterator, DocumentVisitor};

/// A table bound to a transaction.
pub struct Table<'tx> {
    tx: &'tx dyn EngineTransaction,
    codec: &'tx Codec,
    info: TableInfo,
    indexes: Vec<IndexConfig>,
}

impl<'tx> Table<'tx> {
    pub(crate) fn new(
        tx: &'tx dyn EngineTransaction,
        codec: &'tx Codec,
        info: TableInfo,
        indexes: Vec<IndexConfig>,
    ) -> Self {
        Self {
            tx,
            codec,
            info,
            indexes,
        }
    }

    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Indexes maintained on every write to this table
    pub fn indexes(&self) -> &[IndexConfig] {
        &self.indexes
    }

    /// Inserts `d` under the next sequence number and returns its key.
    pub fn insert(&self, d: &dyn Document) -> DbResult<Vec<u8>> {
        let catalog = Catalog::new(self.tx, self.codec);
        loop {
            let pk = catalog.next_sequence(&self.info.name)?.to_be_bytes().to_vec();
            if self.tx.get(&self.info.store_name, &pk)?.is_none() {
                self.insert_with_key(&pk, d)?;
                return Ok(pk);
            }
        }
    }

    /// Inserts `d` under `pk`. Fails with `AlreadyExists` if the key is taken.
    pub fn insert_with_key(&self, pk: &[u8], d: &dyn Document) -> DbResult<()> {
        if self.tx.get(&self.info.store_name, pk)?.is_some() {
            return Err(DbError::already_exists(format!(
                "Document already exists in table {}",
                self.info.name
            )));
        }

        let mut entries = Vec::with_capacity(self.indexes.len());
        for config in &self.indexes {
            if let Some(value) = ValuePath::parse(&config.path)?.get_value(d)? {
                let index = self.index(config);
                index.check_unique(&value)?;
                entries.push((index, value));
            }
        }

        // nothing is written until every unique constraint has passed
        let raw = self.codec.encode_document(d)?;
        self.tx.put(&self.info.store_name, pk, &raw)?;
        for (index, value) in &entries {
            index.put_entry(value, pk)?;
        }
        trace!(target: "quilldb::table", table = %self.info.name, "document inserted");
        Ok(())
    }

    /// Deletes the document under `pk` along with its index entries.
    pub fn delete(&self, pk: &[u8]) -> DbResult<()> {
        let d = self.get_document(pk)?;
        for config in &self.indexes {
            if let Some(value) = ValuePath::parse(&config.path)?.get_value(&d)? {
                self.index(config).delete(&value, pk)?;
            }
        }
        self.tx.delete(&self.info.store_name, pk)?;
        Ok(())
    }

    /// Fetches one document. Fails with `NotFound` if `pk` is absent.
    pub fn get_document(&self, pk: &[u8]) -> DbResult<EncodedDocument> {
        match self.tx.get(&self.info.store_name, pk)? {
            Some(raw) => Ok(EncodedDocument::new(Bytes::from(raw))),
            None => Err(DbError::not_found(format!(
                "Document not found in table {}",
                self.info.name
            ))),
        }
    }

    /// Visits `(primary key, document)` pairs in key order.
    pub fn scan(&self, visit: &mut dyn FnMut(&[u8], &dyn Document) -> DbResult<Control>) -> DbResult<()> {
        self.tx.range(
            &self.info.store_name,
            Bound::Unbounded,
            Bound::Unbounded,
            false,
            &mut |pk, raw| {
                let d = EncodedDocument::new(Bytes::copy_from_slice(raw));
                visit(pk, &d)
            },
        )
    }

    fn index(&self, config: &IndexConfig) -> Index<'tx> {
        Index::new(self.tx, self.codec, config.clone())
    }
}

impl DocumentIterator for Table<'_> {
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        self.scan(&mut |_, d| visit(d))
    }
}
