//! Integration tests for the buffer pool

use std::sync::Arc;
use std::thread;

use heapdb::buffer::BufferPool;
use heapdb::catalog::Catalog;
use heapdb::common::{BufferPoolConfig, DbError, PageId, Permissions, TransactionId};
use heapdb::storage::disk::HeapFile;
use heapdb::tuple::{DataType, Schema, Tuple, TupleBuilder};
use rand::Rng;
use tempfile::TempDir;

const TABLE: u32 = 9;

fn create_pool(pool_size: usize, file_pages: u32) -> (Arc<BufferPool>, TempDir) {
    let dir = TempDir::new().unwrap();
    let schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("score", DataType::Double)
        .build_arc()
        .unwrap();
    let file = HeapFile::with_id(dir.path().join("scores.dat"), TABLE, schema).unwrap();
    for _ in 0..file_pages {
        file.append_empty_page().unwrap();
    }

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(Arc::new(file), "scores", Some("id".into()));
    let pool = Arc::new(BufferPool::new(BufferPoolConfig::new(pool_size), catalog));
    (pool, dir)
}

fn score_row(pool: &BufferPool, id: i32, score: f64) -> Tuple {
    let schema = pool.catalog().schema(TABLE).unwrap();
    TupleBuilder::new(schema).value(id).value(score).build().unwrap()
}

fn page(page_no: u32) -> PageId {
    PageId::new(TABLE, page_no)
}

#[test]
fn test_buffer_pool_evicts_least_recently_used() {
    let (pool, _dir) = create_pool(2, 3);
    let tid = TransactionId::new(1);
    let (a, b, c) = (page(0), page(1), page(2));

    pool.get_page(tid, a, Permissions::ReadOnly).unwrap();
    pool.get_page(tid, b, Permissions::ReadOnly).unwrap();
    pool.get_page(tid, a, Permissions::ReadOnly).unwrap();
    pool.get_page(tid, c, Permissions::ReadOnly).unwrap();

    assert!(pool.is_resident(a));
    assert!(!pool.is_resident(b));
    assert!(pool.is_resident(c));
}

#[test]
fn test_buffer_pool_capacity_never_exceeded() {
    let (pool, _dir) = create_pool(5, 20);
    let mut rng = rand::thread_rng();

    for i in 0..500u64 {
        // fresh transaction per request so no lock piles up
        let tid = TransactionId::new(i);
        let page_no = rng.gen_range(0..20);
        pool.get_page(tid, page(page_no), Permissions::ReadOnly).unwrap();
        pool.transaction_complete(tid, true).unwrap();

        assert!(pool.resident_pages().len() <= pool.capacity());
    }
}

#[test]
fn test_buffer_pool_never_evicts_dirty_pages() {
    let (pool, _dir) = create_pool(3, 6);
    let writer = TransactionId::new(1);
    let reader = TransactionId::new(2);

    // dirty pages 0 and 1 without committing
    let file = pool.catalog().heap_file(TABLE).unwrap();
    let per_page = file.read_page(page(0)).unwrap().num_slots();
    for i in 0..(per_page + 1) as i32 {
        let mut row = score_row(&pool, i, 0.5);
        pool.insert_tuple(writer, TABLE, &mut row).unwrap();
    }

    for page_no in 2..6 {
        pool.get_page(reader, page(page_no), Permissions::ReadOnly).unwrap();
        assert!(pool.is_resident(page(0)));
        assert!(pool.is_resident(page(1)));
    }

    pool.transaction_complete(writer, false).unwrap();
    pool.transaction_complete(reader, true).unwrap();
}

#[test]
fn test_buffer_pool_full_of_dirty_pages() {
    let (pool, _dir) = create_pool(2, 3);
    let tid = TransactionId::new(1);
    let file = pool.catalog().heap_file(TABLE).unwrap();
    let per_page = file.read_page(page(0)).unwrap().num_slots();

    for i in 0..(per_page + 1) as i32 {
        let mut row = score_row(&pool, i, 1.0);
        pool.insert_tuple(tid, TABLE, &mut row).unwrap();
    }

    let result = pool.get_page(tid, page(2), Permissions::ReadOnly);
    assert!(matches!(result, Err(DbError::BufferPoolFull)));
    assert_eq!(pool.resident_pages(), vec![page(0), page(1)]);

    // committing cleans the pages so eviction works again
    pool.transaction_complete(tid, true).unwrap();
    let tid = TransactionId::new(2);
    assert!(pool.get_page(tid, page(2), Permissions::ReadOnly).is_ok());
}

#[test]
fn test_buffer_pool_flush_all_persists() {
    let (pool, dir) = create_pool(4, 0);
    let tid = TransactionId::new(1);

    let mut rows = Vec::new();
    for i in 0..10 {
        let mut row = score_row(&pool, i, i as f64 * 1.5);
        pool.insert_tuple(tid, TABLE, &mut row).unwrap();
        rows.push(row);
    }
    pool.flush_all_pages().unwrap();

    let schema = pool.catalog().schema(TABLE).unwrap();
    let reopened = HeapFile::with_id(dir.path().join("scores.dat"), TABLE, schema).unwrap();
    let stored = reopened.read_page(page(0)).unwrap().tuples().unwrap();
    assert_eq!(stored, rows);
}

#[test]
fn test_buffer_pool_concurrent_readers() {
    let (pool, _dir) = create_pool(4, 8);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let tid = TransactionId::new(t);
                for i in 0..100 {
                    let page_ref = pool.get_page(tid, page(i % 8), Permissions::ReadOnly).unwrap();
                    assert_eq!(page_ref.read().tuple_count(), 0);
                }
                pool.transaction_complete(tid, true).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.resident_pages().len() <= 4);
}
