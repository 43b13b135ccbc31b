//! Table and index definitions persisted in the engine
//!
//! Layout of the `__catalog` store:
//! - `t/<table>` -> `{name, store_name}`
//! - `i/<index>` -> `{index_name, table_name, path, unique}`
//!
//! The `__sequence` store holds the last allocated primary key of each
//! table as 8 big-endian bytes.

use bytes::Bytes;

use crate::codec::Codec;
use crate::document::{Document, EncodedDocument, FieldBuffer, Value};
use crate::errors::{DbError, DbResult};
use crate::index::IndexConfig;
use crate::storage::{prefix_successor, EngineTransaction};
use crate::stream::Control;

pub(crate) const CATALOG_STORE: &str = "__catalog";
pub(crate) const SEQUENCE_STORE: &str = "__sequence";

const TABLE_PREFIX: &str = "t/";
const INDEX_PREFIX: &str = "i/";

/// Catalog entry of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name
    pub name: String,
    /// Engine store holding the documents
    pub store_name: String,
}

impl TableInfo {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            store_name: format!("t_{}", name),
        }
    }

    fn to_document(&self) -> FieldBuffer {
        FieldBuffer::new()
            .with("name", self.name.as_str())
            .with("store_name", self.store_name.as_str())
    }

    fn from_document(d: &dyn Document) -> DbResult<Self> {
        Ok(Self {
            name: text_field(d, "name")?,
            store_name: text_field(d, "store_name")?,
        })
    }
}

fn index_config_to_document(config: &IndexConfig) -> FieldBuffer {
    FieldBuffer::new()
        .with("index_name", config.index_name.as_str())
        .with("table_name", config.table_name.as_str())
        .with("path", config.path.as_str())
        .with("unique", config.unique)
}

fn index_config_from_document(d: &dyn Document) -> DbResult<IndexConfig> {
    let unique = match d.get_by_field("unique")? {
        Some(Value::Bool(b)) => b,
        other => return Err(malformed("unique", other)),
    };
    Ok(IndexConfig {
        index_name: text_field(d, "index_name")?,
        table_name: text_field(d, "table_name")?,
        path: text_field(d, "path")?,
        unique,
    })
}

fn text_field(d: &dyn Document, field: &str) -> DbResult<String> {
    match d.get_by_field(field)? {
        Some(Value::Text(s)) => Ok(s),
        other => Err(malformed(field, other)),
    }
}

fn malformed(field: &str, found: Option<Value>) -> DbError {
    let found = found.map_or("nothing", |v| v.value_type().as_str());
    DbError::format(format!(
        "Catalog entry field '{}' holds {}",
        field, found
    ))
}

/// Catalog access within one transaction.
pub(crate) struct Catalog<'tx> {
    tx: &'tx dyn EngineTransaction,
    codec: &'tx Codec,
}

impl<'tx> Catalog<'tx> {
    pub(crate) fn new(tx: &'tx dyn EngineTransaction, codec: &'tx Codec) -> Self {
        Self { tx, codec }
    }

    /// Creates the catalog stores if the engine is empty.
    pub(crate) fn bootstrap(&self) -> DbResult<bool> {
        if self.tx.has_store(CATALOG_STORE)? {
            return Ok(false);
        }
        self.tx.create_store(CATALOG_STORE)?;
        self.tx.create_store(SEQUENCE_STORE)?;
        Ok(true)
    }

    pub(crate) fn get_table(&self, name: &str) -> DbResult<Option<TableInfo>> {
        self.get(&table_key(name))?
            .map(|d| TableInfo::from_document(&d))
            .transpose()
    }

    pub(crate) fn put_table(&self, info: &TableInfo) -> DbResult<()> {
        self.put(&table_key(&info.name), &info.to_document())
    }

    pub(crate) fn list_tables(&self) -> DbResult<Vec<TableInfo>> {
        let mut out = Vec::new();
        self.scan_prefix(TABLE_PREFIX, &mut |d| {
            out.push(TableInfo::from_document(d)?);
            Ok(())
        })?;
        Ok(out)
    }

    pub(crate) fn get_index(&self, name: &str) -> DbResult<Option<IndexConfig>> {
        self.get(&index_key(name))?
            .map(|d| index_config_from_document(&d))
            .transpose()
    }

    pub(crate) fn put_index(&self, config: &IndexConfig) -> DbResult<()> {
        self.put(
            &index_key(&config.index_name),
            &index_config_to_document(config),
        )
    }

    /// Every index, ordered by index name.
    pub(crate) fn list_indexes(&self) -> DbResult<Vec<IndexConfig>> {
        let mut out = Vec::new();
        self.scan_prefix(INDEX_PREFIX, &mut |d| {
            out.push(index_config_from_document(d)?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Indexes attached to `table`
    pub(crate) fn table_indexes(&self, table: &str) -> DbResult<Vec<IndexConfig>> {
        Ok(self
            .list_indexes()?
            .into_iter()
            .filter(|c| c.table_name == table)
            .collect())
    }

    /// Advances and returns the primary key sequence of `table`.
    pub(crate) fn next_sequence(&self, table: &str) -> DbResult<u64> {
        let current = match self.tx.get(SEQUENCE_STORE, table.as_bytes())? {
            Some(raw) => {
                let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| {
                    DbError::format(format!("Sequence of table {} is not 8 bytes", table))
                })?;
                u64::from_be_bytes(bytes)
            }
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| DbError::conflict(format!("Sequence of table {} exhausted", table)))?;
        self.tx
            .put(SEQUENCE_STORE, table.as_bytes(), &next.to_be_bytes())?;
        Ok(next)
    }

    fn get(&self, key: &str) -> DbResult<Option<EncodedDocument>> {
        Ok(self
            .tx
            .get(CATALOG_STORE, key.as_bytes())?
            .map(|raw| EncodedDocument::new(Bytes::from(raw))))
    }

    fn put(&self, key: &str, d: &FieldBuffer) -> DbResult<()> {
        let raw = self.codec.encode_document(d)?;
        self.tx.put(CATALOG_STORE, key.as_bytes(), &raw)
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visit: &mut dyn FnMut(&dyn Document) -> DbResult<()>,
    ) -> DbResult<()> {
        let upper = prefix_successor(prefix.as_bytes());
        let upper = match &upper {
            Some(k) => std::ops::Bound::Excluded(k.as_slice()),
            None => std::ops::Bound::Unbounded,
        };
        self.tx.range(
            CATALOG_STORE,
            std::ops::Bound::Included(prefix.as_bytes()),
            upper,
            false,
            &mut |_, raw| {
                let d = EncodedDocument::new(Bytes::copy_from_slice(raw));
                visit(&d)?;
                Ok(Control::Continue)
            },
        )
    }
}

fn table_key(name: &str) -> String {
    format!("{}{}", TABLE_PREFIX, name)
}

fn index_key(name: &str) -> String {
    format!("{}{}", INDEX_PREFIX, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Engine, MemoryEngine};

    #[test]
    fn test_table_info_roundtrip() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        let catalog = Catalog::new(&*tx, &codec);
        assert!(catalog.bootstrap().unwrap());
        assert!(!catalog.bootstrap().unwrap());

        catalog.put_table(&TableInfo::new("users")).unwrap();
        let info = catalog.get_table("users").unwrap().unwrap();
        assert_eq!(info.store_name, "t_users");
        assert!(catalog.get_table("missing").unwrap().is_none());
    }

    #[test]
    fn test_index_configs_are_separate_from_tables() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        let catalog = Catalog::new(&*tx, &codec);
        catalog.bootstrap().unwrap();

        catalog.put_table(&TableInfo::new("users")).unwrap();
        catalog
            .put_index(&IndexConfig::new("idx_age", "users", "age").unique())
            .unwrap();

        assert_eq!(catalog.list_tables().unwrap().len(), 1);
        let indexes = catalog.list_indexes().unwrap();
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].unique);
        assert_eq!(catalog.table_indexes("other").unwrap().len(), 0);
    }

    #[test]
    fn test_sequence_advances() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        let catalog = Catalog::new(&*tx, &codec);
        catalog.bootstrap().unwrap();

        assert_eq!(catalog.next_sequence("a").unwrap(), 1);
        assert_eq!(catalog.next_sequence("a").unwrap(), 2);
        assert_eq!(catalog.next_sequence("b").unwrap(), 1);
    }
}
