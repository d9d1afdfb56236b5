use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, Result, TransactionId};
use crate::storage::disk::HeapFile;
use crate::storage::TableIterator;
use crate::tuple::Schema;

/// Database ties one catalog and one buffer pool together and hands out
/// transaction ids. Independent instances share nothing, so tests can run
/// several side by side.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    next_txn: AtomicU64,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config, Arc::clone(&catalog)));
        Self {
            catalog,
            buffer_pool,
            next_txn: AtomicU64::new(1),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Returns a transaction id never handed out before by this database.
    pub fn begin_transaction(&self) -> TransactionId {
        let tid = TransactionId::new(self.next_txn.fetch_add(1, Ordering::SeqCst));
        debug!(%tid, "began transaction");
        tid
    }

    /// Opens the heap file at `path` and registers it under `name`.
    /// Returns the new table's id.
    pub fn open_table<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        schema: Arc<Schema>,
        primary_key: Option<String>,
    ) -> Result<u32> {
        let file = HeapFile::open(path, schema)?;
        Ok(self.catalog.add_table(Arc::new(file), name, primary_key))
    }

    /// Scans every tuple of a table on behalf of `tid`.
    pub fn scan(&self, tid: TransactionId, table_id: u32) -> TableIterator {
        TableIterator::new(Arc::clone(&self.buffer_pool), tid, table_id)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}
