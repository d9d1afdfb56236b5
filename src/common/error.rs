use thiserror::Error;

use super::types::{PageId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} aborted: lock wait exceeded its deadline")]
    TransactionAborted(TransactionId),

    #[error("Buffer pool is full, every resident page is dirty")]
    BufferPoolFull,

    #[error("Page {page_id} is beyond the end of the file ({num_pages} pages)")]
    PageOutOfBounds { page_id: PageId, num_pages: u32 },

    #[error("Table {0} not found")]
    TableNotFound(u32),

    #[error("Table {0:?} not found")]
    TableNameNotFound(String),

    #[error("Page belongs to table {actual}, expected table {expected}")]
    TableMismatch { expected: u32, actual: u32 },

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Page {0} has no free slots")]
    PageFull(PageId),

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Slot {0} is empty")]
    EmptySlot(u16),

    #[error("Tuple is not stored on this page")]
    TupleNotOnPage,

    #[error("Tuple schema does not match the table schema")]
    SchemaMismatch,

    #[error("Value of {actual} bytes exceeds column width {max}")]
    ValueTooLong { max: usize, actual: usize },

    #[error("Value does not match column type {0}")]
    TypeMismatch(String),

    #[error("Schema must contain at least one column")]
    EmptySchema,

    #[error("Tuples of {size} bytes do not fit in a page (max {max})")]
    TupleTooLarge { size: usize, max: usize },

    #[error("Corrupted data: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
