mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryTableStore;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::WaitConfig;

#[derive(Debug, Error)]
pub enum TableStoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Table in use: {0}")]
    InUse(String),
    #[error("Table not found: {0}")]
    NotFound(String),
    #[error("Timed out waiting on table: {0}")]
    Timeout(String),
}

/// A single attribute value. The seed data only ever needs strings and
/// numbers; numbers travel as strings the way the wire format carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    N(String),
    S(String),
}

/// One record, attribute name to value.
pub type Item = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    N,
    S,
}

#[derive(Debug, Clone)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: AttrType,
}

impl KeyAttribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttrType::S,
        }
    }
}

/// A global secondary index keyed on a single hash attribute, projecting all
/// attributes.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub hash_key: KeyAttribute,
}

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: KeyAttribute,
    pub range_key: Option<KeyAttribute>,
    pub indexes: Vec<IndexSpec>,
    pub read_units: u64,
    pub write_units: u64,
}

impl TableSpec {
    /// Attribute names forming the primary key, in schema order.
    pub fn key_names(&self) -> Vec<&str> {
        let mut names = vec![self.hash_key.name.as_str()];
        if let Some(ref range) = self.range_key {
            names.push(range.name.as_str());
        }
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Deleting,
    Updating,
}

/// Abstraction over the managed table store.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, TableStoreError>;
    async fn create_table(&self, spec: &TableSpec) -> Result<(), TableStoreError>;
    async fn delete_table(&self, name: &str) -> Result<(), TableStoreError>;
    /// Current status of the table, or None if it does not exist.
    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, TableStoreError>;
    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableStoreError>;
}

/// Poll until the table reports ACTIVE, backing off between polls.
pub async fn wait_until_active(
    store: &dyn TableStore,
    name: &str,
    waits: &WaitConfig,
) -> Result<(), TableStoreError> {
    let max = Duration::from_millis(waits.poll_max_ms);
    let mut delay = Duration::from_millis(waits.poll_initial_ms);
    for _ in 0..waits.poll_max_attempts {
        if store.table_status(name).await? == Some(TableStatus::Active) {
            return Ok(());
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(max);
    }
    Err(TableStoreError::Timeout(name.to_string()))
}

/// Poll until the table no longer exists, backing off between polls.
pub async fn wait_until_gone(
    store: &dyn TableStore,
    name: &str,
    waits: &WaitConfig,
) -> Result<(), TableStoreError> {
    let max = Duration::from_millis(waits.poll_max_ms);
    let mut delay = Duration::from_millis(waits.poll_initial_ms);
    for _ in 0..waits.poll_max_attempts {
        if store.table_status(name).await?.is_none() {
            return Ok(());
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(max);
    }
    Err(TableStoreError::Timeout(name.to_string()))
}
