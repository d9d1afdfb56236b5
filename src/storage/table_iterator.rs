use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Permissions, Result, TransactionId};
use crate::tuple::Tuple;

/// Sequential scan over every stored tuple of a table, in page then slot
/// order.
///
/// Each page is fetched through the buffer pool under a shared lock held by
/// `tid`, so the scan takes part in two-phase locking like any other read.
/// The page count is re-read when the current page runs out, so pages
/// appended by the scanning transaction itself are visited too.
pub struct TableIterator {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: u32,
    next_page: u32,
    buffered: VecDeque<Tuple>,
    done: bool,
}

impl TableIterator {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, table_id: u32) -> Self {
        Self {
            pool,
            tid,
            table_id,
            next_page: 0,
            buffered: VecDeque::new(),
            done: false,
        }
    }

    /// Restarts the scan from the first page.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffered.clear();
        self.done = false;
    }

    pub fn next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.buffered.pop_front() {
                return Ok(Some(tuple));
            }
            if self.done {
                return Ok(None);
            }

            let num_pages = self.pool.catalog().heap_file(self.table_id)?.num_pages();
            if self.next_page >= num_pages {
                self.done = true;
                return Ok(None);
            }

            let page_id = PageId::new(self.table_id, self.next_page);
            let page = self.pool.get_page(self.tid, page_id, Permissions::ReadOnly)?;
            let tuples = page.read().tuples()?;
            self.buffered.extend(tuples);
            self.next_page += 1;
        }
    }
}

impl Iterator for TableIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match TableIterator::next(self) {
            Ok(Some(tuple)) => Some(Ok(tuple)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::common::BufferPoolConfig;
    use crate::storage::disk::HeapFile;
    use crate::tuple::{DataType, Schema, TupleBuilder, Value};
    use tempfile::TempDir;

    #[test]
    fn test_scan_across_pages() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Char(500))
            .build_arc()
            .unwrap();
        let file = HeapFile::with_id(dir.path().join("t.dat"), 3, schema.clone()).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "t", None);
        let pool = Arc::new(BufferPool::new(BufferPoolConfig::new(8), catalog));

        let tid = TransactionId::new(1);
        for i in 0..20 {
            let mut tuple = TupleBuilder::new(schema.clone())
                .value(i)
                .value(format!("row{i}"))
                .build()
                .unwrap();
            pool.insert_tuple(tid, 3, &mut tuple).unwrap();
        }
        // 506-byte rows leave room for 8 per page
        assert_eq!(pool.catalog().heap_file(3).unwrap().num_pages(), 3);

        let mut iter = TableIterator::new(pool.clone(), tid, 3);
        let ids: Vec<i32> = iter
            .by_ref()
            .map(|t| match t.unwrap().value(0) {
                Some(Value::Integer(v)) => *v,
                other => panic!("unexpected value {other:?}"),
            })
            .collect();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());

        iter.rewind();
        assert_eq!(iter.count(), 20);
    }

    #[test]
    fn test_scan_empty_table() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .build_arc()
            .unwrap();
        let file = HeapFile::with_id(dir.path().join("e.dat"), 4, schema).unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::new(file), "e", None);
        let pool = Arc::new(BufferPool::new(BufferPoolConfig::default(), catalog));

        let mut iter = TableIterator::new(pool, TransactionId::new(1), 4);
        assert!(iter.next().unwrap().is_none());
    }
}
