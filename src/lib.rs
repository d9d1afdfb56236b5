//! heapdb - the storage kernel of a small page-oriented relational database
//!
//! Tables live in heap files of fixed-size pages. A bounded buffer pool caches
//! pages in memory, and every page access is guarded by page-level shared and
//! exclusive locks held until the owning transaction commits or aborts.
//!
//! # Architecture
//!
//! - **Tuple layer** (`tuple`): fixed-width schemas, values and tuples
//! - **Storage layer** (`storage`): on-disk heap files and slotted heap pages
//!   - `HeapFile`: reads and writes whole pages of one table's file
//!   - `HeapPage`: slot bitmap, tuple slots, dirty marker and before-image
//!   - `TableIterator`: sequential scan through the buffer pool
//! - **Concurrency** (`concurrency`): `LockManager` and transaction records
//! - **Buffer Pool** (`buffer`): LRU page cache with no-steal eviction and
//!   commit/abort handling
//! - **Catalog** (`catalog`): table id to file, name and schema registry
//! - **Database** (`database`): one catalog, one buffer pool and an id source
//!
//! # Example
//!
//! ```rust,no_run
//! use heapdb::database::Database;
//! use heapdb::tuple::{DataType, Schema, TupleBuilder};
//!
//! let db = Database::default();
//! let schema = Schema::builder()
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::Char(32))
//!     .build_arc()
//!     .unwrap();
//! let table = db.open_table("users.dat", "users", schema.clone(), None).unwrap();
//!
//! let tid = db.begin_transaction();
//! let mut row = TupleBuilder::new(schema).value(1).value("ada").build().unwrap();
//! db.buffer_pool().insert_tuple(tid, table, &mut row).unwrap();
//! db.buffer_pool().transaction_complete(tid, true).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod database;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, Permissions, RecordId, Result, SlotId, TransactionId};
