pub mod disk;
pub mod page;
mod table_iterator;

pub use table_iterator::TableIterator;
