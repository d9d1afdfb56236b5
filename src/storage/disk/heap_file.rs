use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{DbError, PageId, Result, PAGE_SIZE};
use crate::storage::page::HeapPage;
use crate::tuple::Schema;

/// HeapFile owns the backing file of one table. Page `i` occupies bytes
/// `[i * PAGE_SIZE, (i + 1) * PAGE_SIZE)`.
///
/// It does no caching and no transactional locking; every read and write
/// goes straight to the file. The buffer pool is the only intended caller
/// apart from tests and bulk loaders.
pub struct HeapFile {
    /// Table identifier stamped into every page id of this file
    table_id: u32,
    /// The table's backing file
    file: Mutex<File>,
    /// Path to the backing file
    path: PathBuf,
    /// Fixed tuple layout of the table
    schema: Arc<Schema>,
    /// Number of whole pages in the file
    num_pages: AtomicU32,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl HeapFile {
    /// Opens (or creates) the file at `path`. The table id is derived from
    /// the absolute path, so reopening the same file yields the same id.
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>) -> Result<Self> {
        let absolute = std::path::absolute(path.as_ref())?;
        let mut hasher = DefaultHasher::new();
        absolute.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Self::with_id(path, table_id, schema)
    }

    /// Opens (or creates) the file at `path` under an explicit table id.
    pub fn with_id<P: AsRef<Path>>(path: P, table_id: u32, schema: Arc<Schema>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            table_id,
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            schema,
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Returns the table id.
    pub fn id(&self) -> u32 {
        self.table_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes one page.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_table(page_id)?;

        let num_pages = self.num_pages();
        if page_id.page_no >= num_pages {
            return Err(DbError::PageOutOfBounds { page_id, num_pages });
        }

        let mut data = [0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(page_id.offset()))?;
            // a short read surfaces as UnexpectedEof
            file.read_exact(&mut data)?;
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        HeapPage::new(page_id, self.schema.clone(), &data)
    }

    /// Encodes and writes one page, extending the file if needed.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.page_id();
        self.check_table(page_id)?;

        let mut file = self.file.lock();
        Self::write_at(&mut file, page_id, page.data())?;

        self.num_pages.fetch_max(page_id.page_no + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes an empty page at the end of the file and returns its id.
    /// Concurrent callers always receive distinct pages.
    pub fn append_empty_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();

        let page_id = PageId::new(self.table_id, self.num_pages());
        let page = HeapPage::empty(page_id, self.schema.clone());
        Self::write_at(&mut file, page_id, page.data())?;

        self.num_pages.store(page_id.page_no + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!(%page_id, "appended empty page");
        Ok(page_id)
    }

    fn write_at(file: &mut File, page_id: PageId, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len(), PAGE_SIZE);
        file.seek(SeekFrom::Start(page_id.offset()))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn check_table(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(DbError::TableMismatch {
                expected: self.table_id,
                actual: page_id.table_id,
            });
        }
        Ok(())
    }

    /// Returns floor(file length / PAGE_SIZE).
    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    /// Returns the number of page reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        let file = self.file.get_mut();
        let _ = file.sync_all();
    }
}
