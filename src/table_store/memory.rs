use std::collections::HashMap;
use std::sync::Mutex;

use super::{Item, TableSpec, TableStatus, TableStore, TableStoreError};

/// In-memory table store for dry runs and tests.
///
/// Tables become ACTIVE immediately; puts overwrite on primary key the way
/// the real store does.
#[derive(Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<String, TableState>>,
}

struct TableState {
    spec: TableSpec,
    items: Vec<Item>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items currently stored in a table. Empty if the table does not exist.
    pub fn items(&self, table: &str) -> Vec<Item> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .map(|state| state.items.clone())
            .unwrap_or_default()
    }

    /// Names of all existing tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let tables = self.tables.lock().unwrap();
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryTableStore {
    async fn list_tables(&self) -> Result<Vec<String>, TableStoreError> {
        Ok(self.table_names())
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), TableStoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(&spec.name) {
            return Err(TableStoreError::InUse(spec.name.clone()));
        }
        tables.insert(
            spec.name.clone(),
            TableState {
                spec: spec.clone(),
                items: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<(), TableStoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.remove(name).is_none() {
            return Err(TableStoreError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, TableStoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.get(name).map(|_| TableStatus::Active))
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableStoreError> {
        let mut tables = self.tables.lock().unwrap();
        let state = tables
            .get_mut(table)
            .ok_or_else(|| TableStoreError::NotFound(table.to_string()))?;

        let key_names = state.spec.key_names();
        let position = state.items.iter().position(|existing| {
            key_names
                .iter()
                .all(|name| existing.get(*name) == item.get(*name))
        });
        match position {
            Some(index) => state.items[index] = item,
            None => state.items.push(item),
        }
        Ok(())
    }
}
