//! Table registry consumed by the buffer pool.
//!
//! Maps table ids to their heap files, names and primary keys. Loading a
//! catalog from schema text is left to callers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{DbError, Result};
use crate::storage::disk::HeapFile;
use crate::tuple::Schema;

/// A registered table.
#[derive(Clone)]
pub struct TableInfo {
    pub file: Arc<HeapFile>,
    pub name: String,
    pub primary_key: Option<String>,
}

#[derive(Default)]
struct CatalogState {
    tables: HashMap<u32, TableInfo>,
    name_to_id: HashMap<String, u32>,
}

/// Catalog keeps track of all available tables and their schemas.
#[derive(Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under `file.id()`. On a name conflict the most
    /// recently added table wins the name.
    pub fn add_table(
        &self,
        file: Arc<HeapFile>,
        name: impl Into<String>,
        primary_key: Option<String>,
    ) -> u32 {
        let name = name.into();
        let table_id = file.id();
        let mut state = self.state.write();

        if let Some(previous) = state.tables.get(&table_id) {
            let previous_name = previous.name.clone();
            if state.name_to_id.get(&previous_name) == Some(&table_id) {
                state.name_to_id.remove(&previous_name);
            }
        }

        state.name_to_id.insert(name.clone(), table_id);
        state.tables.insert(
            table_id,
            TableInfo {
                file,
                name: name.clone(),
                primary_key,
            },
        );

        debug!(table_id, %name, "registered table");
        table_id
    }

    /// Returns the id of the table with the given name.
    pub fn table_id(&self, name: &str) -> Result<u32> {
        self.state
            .read()
            .name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    pub fn table(&self, table_id: u32) -> Result<TableInfo> {
        self.state
            .read()
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(DbError::TableNotFound(table_id))
    }

    /// Returns the heap file backing the table.
    pub fn heap_file(&self, table_id: u32) -> Result<Arc<HeapFile>> {
        self.table(table_id).map(|info| info.file)
    }

    pub fn schema(&self, table_id: u32) -> Result<Arc<Schema>> {
        self.table(table_id).map(|info| info.file.schema().clone())
    }

    pub fn table_name(&self, table_id: u32) -> Result<String> {
        self.table(table_id).map(|info| info.name)
    }

    pub fn primary_key(&self, table_id: u32) -> Result<Option<String>> {
        self.table(table_id).map(|info| info.primary_key)
    }

    /// Returns the ids of all registered tables.
    pub fn table_ids(&self) -> Vec<u32> {
        self.state.read().tables.keys().copied().collect()
    }

    /// Removes every table.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.tables.clear();
        state.name_to_id.clear();
    }
}
