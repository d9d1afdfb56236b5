use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{DbError, Result, PAGE_SIZE};

use super::DataType;

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    name: String,

    /// Column data type
    data_type: DataType,

    /// Column position in the schema (0-indexed)
    ordinal: usize,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ordinal: 0, // Will be set by Schema
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column data type.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the column's ordinal position in the schema.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Returns the on-disk width of this column.
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

/// Represents the schema of a table. All tuples of a schema encode to
/// exactly [`Schema::tuple_size`] bytes.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,

    /// Map from column name to column index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Sum of all column widths
    tuple_size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    /// A schema needs at least one column, and a page must hold at least one
    /// of its tuples plus that tuple's bitmap bit.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(DbError::EmptySchema);
        }

        let mut columns = columns;
        let mut name_to_index = HashMap::new();
        let mut tuple_size = 0;

        for (i, col) in columns.iter_mut().enumerate() {
            col.ordinal = i;
            // first column with a given name wins lookups
            name_to_index.entry(col.name.clone()).or_insert(i);
            tuple_size += col.size();
        }

        if tuple_size * 8 + 1 > PAGE_SIZE * 8 {
            return Err(DbError::TupleTooLarge {
                size: tuple_size,
                max: Self::max_tuple_size(),
            });
        }

        Ok(Self {
            columns,
            name_to_index,
            tuple_size,
        })
    }

    /// Largest tuple size that still leaves one slot per page.
    pub fn max_tuple_size() -> usize {
        (PAGE_SIZE * 8 - 1) / 8
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the number of columns in the schema.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at the given index.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the column with the given name.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.name_to_index
            .get(name)
            .and_then(|&i| self.columns.get(i))
    }

    /// Returns the index of the column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Returns an iterator over all columns.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the encoded size of one tuple in bytes.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Result<Arc<Schema>> {
        self.build().map(Arc::new)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> Schema {
        Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Char(16))
            .column("balance", DataType::Double)
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_creation() {
        let schema = create_test_schema();

        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column(0).unwrap().name(), "id");
        assert_eq!(schema.column(1).unwrap().name(), "name");
        assert_eq!(schema.column(2).unwrap().name(), "balance");
        assert!(schema.column(3).is_none());
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(
            Schema::builder().build(),
            Err(DbError::EmptySchema)
        ));
    }

    #[test]
    fn test_oversized_tuple_rejected() {
        // 4 + (2 + 4095) bytes cannot share a page with its bitmap bit
        let result = Schema::builder()
            .column("id", DataType::Integer)
            .column("blob", DataType::Char(4095))
            .build();
        assert!(matches!(
            result,
            Err(DbError::TupleTooLarge { size: 4101, max: 4095 })
        ));

        // the largest accepted tuple fills a page with exactly one slot
        let schema = Schema::builder()
            .column("blob", DataType::Char(4093))
            .build()
            .unwrap();
        assert_eq!(schema.tuple_size(), Schema::max_tuple_size());
    }

    #[test]
    fn test_column_lookup() {
        let schema = create_test_schema();

        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("nonexistent"), None);

        let col = schema.column_by_name("name").unwrap();
        assert_eq!(*col.data_type(), DataType::Char(16));
    }

    #[test]
    fn test_ordinals() {
        let schema = create_test_schema();

        for (i, col) in schema.columns().enumerate() {
            assert_eq!(col.ordinal(), i);
        }
    }

    #[test]
    fn test_tuple_size() {
        // 4 + (2 + 16) + 8
        assert_eq!(create_test_schema().tuple_size(), 30);
    }
}
