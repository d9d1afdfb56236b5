use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, RecordId, Result};

use super::{Schema, Value};

/// Represents a single row/tuple in a table.
///
/// A tuple holds one value per schema column and, once stored, the
/// [`RecordId`] of the slot it lives in.
///
/// ## Tuple Binary Format
///
/// Columns are written back to back in schema order, each occupying exactly
/// its type's width:
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | column 0  | column 1  | ... | column n  |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// There is no null bitmap and no variable-length tail, so every tuple of a
/// schema has the same encoded size.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The schema defining the structure of this tuple
    schema: Arc<Schema>,

    /// The values for each column (in schema order)
    values: Vec<Value>,

    /// Location on disk, if the tuple has been stored
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple with the given schema and values.
    /// Fails if the values do not line up with the schema's columns.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.column_count() {
            return Err(DbError::SchemaMismatch);
        }
        for (value, col) in values.iter().zip(schema.columns()) {
            if !value.matches(col.data_type()) {
                return Err(DbError::TypeMismatch(col.data_type().to_string()));
            }
        }

        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Decodes a tuple from exactly `schema.tuple_size()` bytes.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        if data.len() != schema.tuple_size() {
            return Err(DbError::Corrupted(format!(
                "tuple is {} bytes, schema expects {}",
                data.len(),
                schema.tuple_size()
            )));
        }

        let mut buf = data;
        let values = schema
            .columns()
            .map(|col| Value::decode(col.data_type(), &mut buf))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Encodes the tuple into its fixed-width byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.schema.tuple_size());
        for (value, col) in self.values.iter().zip(self.schema.columns()) {
            value.encode(col.data_type(), &mut bytes)?;
        }
        Ok(bytes)
    }

    /// Returns the schema of this tuple.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value for the given column name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// Returns all values in this tuple.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at the given column index.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        let col = self
            .schema
            .column(index)
            .ok_or(DbError::SchemaMismatch)?;
        if !value.matches(col.data_type()) {
            return Err(DbError::TypeMismatch(col.data_type().to_string()));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Returns the number of columns/values in this tuple.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this tuple has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns where this tuple is stored, if anywhere.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }
}

/// Tuples compare by content; the record id is ignored.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.schema == other.schema
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.values {
            if !first {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        Ok(())
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let capacity = schema.column_count();
        Self {
            schema,
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends the next column's value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.values)
    }
}
