//! Index entries stored in an engine transaction

use std::ops::Bound;

use bytes::Bytes;
use tracing::trace;

use super::{IndexConfig, IndexKey, IndexRange, IndexVisitor, OrderedIndex};
use crate::codec::{Codec, Decoder};
use crate::document::{Value, ValueBuffer};
use crate::errors::{DbError, DbResult};
use crate::storage::{prefix_successor, EngineTransaction};
use crate::stream::Control;

/// Engine store holding the entries of index `name`
pub fn index_store_name(name: &str) -> String {
    format!("i_{}", name)
}

/// An index bound to a transaction.
pub struct Index<'tx> {
    tx: &'tx dyn EngineTransaction,
    codec: &'tx Codec,
    config: IndexConfig,
    store: String,
}

impl<'tx> Index<'tx> {
    pub fn new(tx: &'tx dyn EngineTransaction, codec: &'tx Codec, config: IndexConfig) -> Self {
        let store = index_store_name(&config.index_name);
        Self {
            tx,
            codec,
            config,
            store,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.index_name
    }

    /// Adds an entry for `value` pointing at `pk`.
    ///
    /// On a unique index, fails with `AlreadyExists` if another entry holds
    /// an equal non-null value.
    pub fn set(&self, value: &Value, pk: &[u8]) -> DbResult<()> {
        self.check_unique(value)?;
        self.put_entry(value, pk)
    }

    /// Fails with `AlreadyExists` if `value` is already held on a unique
    /// index. Writes nothing.
    pub fn check_unique(&self, value: &Value) -> DbResult<()> {
        if !self.config.unique || value.is_null() {
            return Ok(());
        }
        let key = IndexKey::from_value(value)?;
        let upper = prefix_successor(&key);
        let mut taken = false;
        self.tx.range(
            &self.store,
            Bound::Included(key.as_slice()),
            borrowed(&upper.map_or(Bound::Unbounded, Bound::Excluded)),
            false,
            &mut |_, _| {
                taken = true;
                Ok(Control::Stop)
            },
        )?;
        if taken {
            return Err(duplicate(value, &self.config.index_name));
        }
        Ok(())
    }

    pub(crate) fn put_entry(&self, value: &Value, pk: &[u8]) -> DbResult<()> {
        let mut key = IndexKey::from_value(value)?;
        key.extend_from_slice(pk);
        let entry = ValueBuffer::new().with(value.clone()).with(pk.to_vec());
        let raw = self.codec.encode_array(&entry)?;
        self.tx.put(&self.store, &key, &raw)
    }

    /// Removes the entry for `value` and `pk`, returning whether it existed.
    pub fn delete(&self, value: &Value, pk: &[u8]) -> DbResult<bool> {
        let mut key = IndexKey::from_value(value)?;
        key.extend_from_slice(pk);
        self.tx.delete(&self.store, &key)
    }

    fn decode_entry(raw: &[u8]) -> DbResult<(Value, Vec<u8>)> {
        let mut dec = Decoder::new(Bytes::copy_from_slice(raw));
        if dec.read_array_len()? != 2 {
            return Err(DbError::format("index entry is not a [value, pk] pair"));
        }
        let value = dec.decode_value()?;
        let pk = dec.decode_value()?;
        if dec.remaining() > 0 {
            return Err(DbError::format("trailing bytes after index entry"));
        }
        match pk {
            Value::Blob(pk) => Ok((value, pk)),
            other => Err(DbError::type_mismatch(format!(
                "index entry primary key is {}, expected blob",
                other.value_type()
            ))),
        }
    }
}

impl OrderedIndex for Index<'_> {
    fn iterate_range(
        &self,
        range: &IndexRange,
        reverse: bool,
        visit: &mut IndexVisitor<'_>,
    ) -> DbResult<()> {
        let (lower, upper) = match range.key_bounds()? {
            Some(bounds) => bounds,
            None => return Ok(()),
        };
        trace!(
            target: "quilldb::index",
            index = %self.config.index_name,
            reverse,
            "index range scan"
        );
        self.tx.range(
            &self.store,
            borrowed(&lower),
            borrowed(&upper),
            reverse,
            &mut |_, raw| {
                let (value, pk) = Self::decode_entry(raw)?;
                visit(&value, &pk)
            },
        )
    }
}

pub(crate) fn duplicate(value: &Value, index: &str) -> DbError {
    DbError::already_exists(format!("Duplicate value {} for unique index {}", value, index))
}

fn borrowed(b: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match b {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::storage::{Engine, MemoryEngine};

    fn collect(index: &Index<'_>, range: &IndexRange, reverse: bool) -> Vec<(Value, Vec<u8>)> {
        let mut out = Vec::new();
        index
            .iterate_range(range, reverse, &mut |v, pk| {
                out.push((v.clone(), pk.to_vec()));
                Ok(Control::Continue)
            })
            .unwrap();
        out
    }

    #[test]
    fn test_entries_sorted_by_value_then_pk() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        tx.create_store(&index_store_name("idx")).unwrap();
        let index = Index::new(&*tx, &codec, IndexConfig::new("idx", "t", "a"));

        index.set(&Value::Double(3.0), b"p1").unwrap();
        index.set(&Value::Integer(1), b"p2").unwrap();
        index.set(&Value::from("x"), b"p3").unwrap();
        index.set(&Value::Double(1.0), b"p0").unwrap();

        let all = collect(&index, &IndexRange::all(), false);
        let pks: Vec<Vec<u8>> = all.iter().map(|(_, pk)| pk.clone()).collect();
        assert_eq!(
            pks,
            vec![b"p0".to_vec(), b"p2".to_vec(), b"p1".to_vec(), b"p3".to_vec()]
        );
        // tags survive the round trip through the entry value
        assert_eq!(all[1].0, Value::Integer(1));
    }

    #[test]
    fn test_ascend_and_descend_from_pivot() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        tx.create_store(&index_store_name("idx")).unwrap();
        let index = Index::new(&*tx, &codec, IndexConfig::new("idx", "t", "a"));
        for (i, v) in [10.0, 20.0, 30.0].iter().enumerate() {
            index.set(&Value::Double(*v), &[i as u8]).unwrap();
        }

        let mut up = Vec::new();
        index
            .ascend_greater_or_equal(Some(&Value::Double(20.0)), &mut |v, _| {
                up.push(v.as_double().unwrap());
                Ok(Control::Continue)
            })
            .unwrap();
        assert_eq!(up, vec![20.0, 30.0]);

        let mut down = Vec::new();
        index
            .descend_less_or_equal(Some(&Value::Double(20.0)), &mut |v, _| {
                down.push(v.as_double().unwrap());
                Ok(Control::Continue)
            })
            .unwrap();
        assert_eq!(down, vec![20.0, 10.0]);
    }

    #[test]
    fn test_unique_index_rejects_duplicates() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        tx.create_store(&index_store_name("u")).unwrap();
        let index = Index::new(&*tx, &codec, IndexConfig::new("u", "t", "email").unique());

        index.set(&Value::from("a@x"), b"1").unwrap();
        let err = index.set(&Value::from("a@x"), b"2").unwrap_err();
        assert!(err.is(ErrorCode::AlreadyExists));

        index.set(&Value::Null, b"3").unwrap();
        index.set(&Value::Null, b"4").unwrap();
    }

    #[test]
    fn test_check_unique_writes_nothing() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        tx.create_store(&index_store_name("u")).unwrap();
        let index = Index::new(&*tx, &codec, IndexConfig::new("u", "t", "n").unique());

        index.check_unique(&Value::Integer(1)).unwrap();
        assert!(collect(&index, &IndexRange::all(), false).is_empty());

        index.set(&Value::Double(1.0), b"1").unwrap();
        let err = index.check_unique(&Value::Integer(1)).unwrap_err();
        assert!(err.is(ErrorCode::AlreadyExists));
        assert_eq!(collect(&index, &IndexRange::all(), false).len(), 1);
    }

    #[test]
    fn test_delete_entry() {
        let engine = MemoryEngine::new();
        let codec = Codec::new();
        let tx = engine.begin(true).unwrap();
        tx.create_store(&index_store_name("idx")).unwrap();
        let index = Index::new(&*tx, &codec, IndexConfig::new("idx", "t", "a"));

        index.set(&Value::Integer(5), b"k").unwrap();
        assert!(index.delete(&Value::Integer(5), b"k").unwrap());
        assert!(!index.delete(&Value::Integer(5), b"k").unwrap());
        assert!(collect(&index, &IndexRange::all(), false).is_empty());
    }
}
