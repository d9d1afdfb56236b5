use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::catalog::Catalog;
use crate::common::{
    BufferPoolConfig, DbError, PageId, Permissions, RecordId, Result, TransactionId,
};
use crate::concurrency::{LockManager, LockMode, Transaction};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

use super::LruCache;

/// Shared handle to a cached page.
///
/// Readers take `read()` on the handle. Do not hold a page guard across
/// another call into the buffer pool; the pool takes page locks while it
/// holds its own cache mutex.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// BufferPool caches a bounded number of pages and mediates all page access
/// by transactions.
///
/// Every page request first takes a page lock through the [`LockManager`]
/// (strict two-phase locking; locks are only released when the transaction
/// completes). A request that cannot be granted is retried until the
/// transaction's lock timeout, measured from its first request, runs out, at
/// which point the transaction must abort. This timeout is the only deadlock
/// handling.
///
/// Eviction is LRU over clean pages only: dirty pages stay resident until
/// their transaction commits (no steal), so uncommitted data never reaches
/// disk and abort only has to restore cached before-images.
pub struct BufferPool {
    config: BufferPoolConfig,
    catalog: Arc<Catalog>,
    /// Resident pages in recency order
    cache: Mutex<LruCache<PageId, PageRef>>,
    lock_manager: LockManager,
    /// Running transactions, keyed by id
    transactions: Mutex<HashMap<TransactionId, Transaction>>,
}

impl BufferPool {
    pub fn new(mut config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        // the field is public, so a zero capacity can bypass the setters
        config.num_pages = config.num_pages.max(1);
        let cache = LruCache::with_capacity(config.num_pages);
        Self {
            config,
            catalog,
            cache: Mutex::new(cache),
            lock_manager: LockManager::new(),
            transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Retrieves a page on behalf of `tid`, locking it in the mode implied
    /// by `perm`.
    ///
    /// Blocks while another transaction holds a conflicting lock. Fails with
    /// [`DbError::TransactionAborted`] once the transaction has waited past
    /// its deadline; the caller must then abort it.
    pub fn get_page(&self, tid: TransactionId, page_id: PageId, perm: Permissions) -> Result<PageRef> {
        let txn = self.register(tid);
        self.acquire_lock(&txn, page_id, perm.into())?;

        let mut cache = self.cache.lock();
        self.fetch_locked(&mut cache, page_id)
    }

    /// Adds a tuple to the table on behalf of `tid` and returns where it
    /// was stored.
    ///
    /// Pages are scanned in order under write locks for a free slot. If
    /// every page is full, an empty page is appended to the file and the
    /// tuple goes there.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: &mut Tuple) -> Result<RecordId> {
        let file = self.catalog.heap_file(table_id)?;
        if **tuple.schema() != **file.schema() {
            return Err(DbError::SchemaMismatch);
        }

        for page_no in 0..file.num_pages() {
            let page_id = PageId::new(table_id, page_no);
            let inserted = self.update_page(tid, page_id, |page| {
                if page.empty_slot_count() == 0 {
                    return Ok(None);
                }
                page.insert_tuple(tuple).map(Some)
            })?;

            if let Some(record_id) = inserted {
                return Ok(record_id);
            }
        }

        let page_id = file.append_empty_page()?;
        self.update_page(tid, page_id, |page| page.insert_tuple(tuple).map(Some))?
            .ok_or(DbError::PageFull(page_id))
    }

    /// Removes a stored tuple on behalf of `tid`. The tuple's record id is
    /// cleared on success.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &mut Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        // unknown tables are a caller bug, reject before locking anything
        self.catalog.heap_file(record_id.page_id.table_id)?;

        self.update_page(tid, record_id.page_id, |page| {
            page.delete_tuple(tuple).map(Some)
        })?;
        Ok(())
    }

    /// Commits or aborts `tid` and releases all of its locks.
    ///
    /// Commit writes every page the transaction dirtied. If a write fails
    /// the error is returned with the transaction's locks still held, so the
    /// caller can abort instead. Abort restores the before-image of every
    /// resident page the transaction dirtied.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
            debug!(%tid, "committed");
        } else {
            self.rollback(tid);
            debug!(%tid, "aborted");
        }

        self.lock_manager.release_all(tid);
        self.transactions.lock().remove(&tid);
        Ok(())
    }

    /// Returns true if `tid` holds a lock on the page.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(tid, page_id)
    }

    /// Releases the lock `tid` holds on a single page before the
    /// transaction completes. This breaks two-phase locking; only use it for
    /// pages the transaction has not read anything meaningful from.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_manager.release(tid, page_id);
    }

    /// Writes every dirty resident page to disk.
    ///
    /// This also writes uncommitted changes, so it is only safe at shutdown
    /// or when no transactions are running.
    pub fn flush_all_pages(&self) -> Result<()> {
        let cache = self.cache.lock();
        for (&page_id, page) in cache.iter() {
            self.flush_resident(page_id, page)?;
        }
        Ok(())
    }

    /// Writes one resident page to disk if it is dirty, and marks it clean.
    ///
    /// The page's before-image is dropped, so if the page holds changes of a
    /// running transaction, a later abort of that transaction cannot undo
    /// them. Only flush pages whose writer has committed or is known to
    /// commit.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let cache = self.cache.lock();
        match cache.peek(&page_id) {
            Some(page) => self.flush_resident(page_id, page),
            None => Ok(()),
        }
    }

    /// Writes every resident page dirtied by `tid` to disk and marks them
    /// clean. This is the commit step: after it, aborting `tid` no longer
    /// restores those pages.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let cache = self.cache.lock();
        for (&page_id, page) in cache.iter() {
            let dirtied = page.read().dirtier() == Some(tid);
            if dirtied {
                self.flush_resident(page_id, page)?;
            }
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        if self.cache.lock().remove(&page_id).is_some() {
            debug!(%page_id, "discarded page");
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.num_pages
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Returns the resident pages from least to most recently used.
    pub fn resident_pages(&self) -> Vec<PageId> {
        self.cache.lock().iter_lru().map(|(&page_id, _)| page_id).collect()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.cache.lock().contains(&page_id)
    }

    /// Returns the bookkeeping for a running transaction.
    pub fn transaction(&self, tid: TransactionId) -> Option<Transaction> {
        self.transactions.lock().get(&tid).copied()
    }

    fn register(&self, tid: TransactionId) -> Transaction {
        *self
            .transactions
            .lock()
            .entry(tid)
            .or_insert_with(|| Transaction::new(tid))
    }

    /// Polls the lock manager until the lock is granted or the transaction's
    /// deadline passes. Never called with the cache mutex held.
    fn acquire_lock(&self, txn: &Transaction, page_id: PageId, mode: LockMode) -> Result<()> {
        loop {
            if self.lock_manager.acquire(txn.id(), page_id, mode) {
                return Ok(());
            }
            if txn.is_expired(self.config.lock_timeout) {
                warn!(tid = %txn.id(), %page_id, ?mode, "lock wait timed out");
                return Err(DbError::TransactionAborted(txn.id()));
            }
            thread::sleep(self.config.lock_retry_interval);
        }
    }

    /// Locks a page exclusively for `tid` and runs `update` on it while the
    /// cache mutex is held, so the page cannot be evicted mid-update. The
    /// page is marked dirty when `update` returns `Some`.
    fn update_page<R>(
        &self,
        tid: TransactionId,
        page_id: PageId,
        update: impl FnOnce(&mut HeapPage) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let txn = self.register(tid);
        self.acquire_lock(&txn, page_id, LockMode::Exclusive)?;

        let mut cache = self.cache.lock();
        let page = self.fetch_locked(&mut cache, page_id)?;
        let mut page = page.write();

        let result = update(&mut page)?;
        if result.is_some() {
            page.mark_dirty(tid);
        }
        Ok(result)
    }

    /// Returns the cached page, reading it from disk (and evicting if the
    /// cache is full) on a miss.
    fn fetch_locked(&self, cache: &mut LruCache<PageId, PageRef>, page_id: PageId) -> Result<PageRef> {
        if let Some(page) = cache.get(&page_id) {
            trace!(%page_id, "buffer pool hit");
            return Ok(Arc::clone(page));
        }

        debug!(%page_id, "buffer pool miss, reading from disk");
        let file = self.catalog.heap_file(page_id.table_id)?;
        let page = file.read_page(page_id)?;

        if cache.len() >= self.config.num_pages {
            Self::evict_page(cache)?;
        }

        let page = Arc::new(RwLock::new(page));
        cache.insert(page_id, Arc::clone(&page));
        Ok(page)
    }

    /// Evicts the least recently used clean page.
    fn evict_page(cache: &mut LruCache<PageId, PageRef>) -> Result<PageId> {
        let victim = cache
            .iter_lru()
            .find(|(_, page)| !page.read().is_dirty())
            .map(|(&page_id, _)| page_id);

        match victim {
            Some(page_id) => {
                cache.remove(&page_id);
                debug!(%page_id, "evicted page");
                Ok(page_id)
            }
            None => {
                warn!(resident = cache.len(), "cannot evict, every page is dirty");
                Err(DbError::BufferPoolFull)
            }
        }
    }

    /// Writes a dirty page and marks it clean. Disk is written before the
    /// in-memory state changes, so a failed write leaves the page dirty.
    fn flush_resident(&self, page_id: PageId, page: &PageRef) -> Result<()> {
        if !page.read().is_dirty() {
            return Ok(());
        }

        let file = self.catalog.heap_file(page_id.table_id)?;
        let mut page = page.write();
        file.write_page(&page)?;
        page.commit_changes();
        trace!(%page_id, "flushed page");
        Ok(())
    }

    /// Restores every resident page `tid` dirtied. The affected page ids are
    /// collected before any page is touched.
    fn rollback(&self, tid: TransactionId) {
        let locked = self.lock_manager.pages_locked_by(tid);

        let cache = self.cache.lock();
        for page_id in locked {
            let Some(page) = cache.peek(&page_id) else {
                continue;
            };
            let dirtied = page.read().dirtier() == Some(tid);
            if dirtied {
                page.write().rollback();
                trace!(%page_id, %tid, "restored before-image");
            }
        }
    }
}
