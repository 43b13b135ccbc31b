//! quilldb - an embedded document database
//!
//! Documents are stored through a lazy MessagePack codec and read back as
//! pull-based streams, either by table scan or through ordered secondary
//! indexes.
//!
//! ```
//! use quilldb::database::Database;
//! use quilldb::document::FieldBuffer;
//! use quilldb::tree::{Direction, IndexInputNode, Node};
//!
//! let db = Database::new().unwrap();
//! db.update(|tx| {
//!     tx.create_table("users")?;
//!     tx.create_index(quilldb::index::IndexConfig::new("idx_age", "users", "age"))?;
//!     tx.get_table("users")?.insert(&FieldBuffer::new().with("age", 36i64))?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let count = db
//!     .view(|tx| {
//!         let node = IndexInputNode::full("users", "idx_age", Direction::Asc);
//!         node.to_stream(tx, &[])?.count()
//!     })
//!     .unwrap();
//! assert_eq!(count, 1);
//! ```

pub mod codec;
pub mod config;
pub mod database;
pub mod document;
pub mod errors;
pub mod expr;
pub mod index;
pub mod storage;
pub mod stream;
pub mod tree;

pub use errors::{DbError, DbResult, ErrorCode};
