//! MessagePack codec for quilldb
//!
//! One self-describing format is shared by table storage and index entries.
//!
//! # Wire format
//!
//! - Document: map, field count then (string, value) pairs in iteration order
//! - Array: array, element count then values in index order
//! - Null, Bool, Integer, Double, Text, Blob: native MessagePack encodings
//! - Duration: extension block, type [`DURATION_TYPE`], 8 bytes big-endian nanoseconds
//!
//! # Invariants
//!
//! - An encoded Integer never decodes as a Duration, and vice versa
//! - Decoding a container only measures its extent; contents decode on access
//! - Unknown markers and extension types are format errors, never panics

mod decoder;
mod encoded;
mod encoder;
mod pool;

pub use decoder::Decoder;
pub use encoded::{EncodedArray, EncodedDocument};
pub use encoder::Encoder;
pub use pool::{BufferPool, PooledBuffer};

use bytes::Bytes;

use crate::config::DatabaseConfig;
use crate::document::{Array, Document, Value};
use crate::errors::{DbError, DbResult};

/// Extension type code reserved for durations.
pub const DURATION_TYPE: i8 = 0x1;

/// Entry point used by tables and indexes to encode and decode.
#[derive(Debug)]
pub struct Codec {
    pool: BufferPool,
}

impl Codec {
    /// Creates a codec with the default pool settings
    pub fn new() -> Self {
        Self::with_config(&DatabaseConfig::default())
    }

    /// Creates a codec sized from `config`
    pub fn with_config(config: &DatabaseConfig) -> Self {
        Self {
            pool: BufferPool::new(
                config.encoder_pool_size,
                config.buffer_capacity,
                config.max_pooled_buffer,
            ),
        }
    }

    /// Encodes a document into a pooled buffer.
    pub fn encode_document(&self, d: &dyn Document) -> DbResult<PooledBuffer<'_>> {
        let mut buf = self.pool.get();
        Encoder::new(buf.as_mut_vec()).encode_document(d)?;
        Ok(buf)
    }

    /// Encodes an array into a pooled buffer.
    pub fn encode_array(&self, a: &dyn Array) -> DbResult<PooledBuffer<'_>> {
        let mut buf = self.pool.get();
        Encoder::new(buf.as_mut_vec()).encode_array(a)?;
        Ok(buf)
    }

    /// Encodes a single value into a pooled buffer.
    pub fn encode_value(&self, v: &Value) -> DbResult<PooledBuffer<'_>> {
        let mut buf = self.pool.get();
        Encoder::new(buf.as_mut_vec()).encode_value(v)?;
        Ok(buf)
    }

    /// Wraps encoded bytes as a lazy document.
    pub fn new_document(&self, data: impl Into<Bytes>) -> EncodedDocument {
        EncodedDocument::new(data)
    }

    /// Decodes one top-level value. Bytes left over after it are a
    /// `FormatError`.
    pub fn decode_value(&self, data: impl Into<Bytes>) -> DbResult<Value> {
        let mut dec = Decoder::new(data.into());
        let value = dec.decode_value()?;
        if dec.remaining() > 0 {
            return Err(DbError::format(format!(
                "{} trailing bytes after value at offset {}",
                dec.remaining(),
                dec.position()
            )));
        }
        Ok(value)
    }

    /// Returns the buffer pool
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}
