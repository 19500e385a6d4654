use tracing::info;

use crate::config::{Config, TableNames};
use crate::table_store::{self, IndexSpec, KeyAttribute, TableSpec, TableStore};

/// Create the three demo tables, blocking until each reports ACTIVE.
pub(crate) async fn run(config: &Config, tables: &dyn TableStore) -> anyhow::Result<usize> {
    let specs = table_specs(&config.tables);
    let count = specs.len();
    for spec in specs {
        info!(table = %spec.name, "Creating table");
        tables.create_table(&spec).await?;
        table_store::wait_until_active(tables, &spec.name, &config.waits).await?;
        info!(table = %spec.name, "Table active");
    }
    Ok(count)
}

/// Declared schemas for the login, subscriptions, and music tables.
pub fn table_specs(names: &TableNames) -> Vec<TableSpec> {
    vec![
        TableSpec {
            name: names.login.clone(),
            hash_key: KeyAttribute::string("email"),
            range_key: None,
            indexes: Vec::new(),
            read_units: names.read_units,
            write_units: names.write_units,
        },
        TableSpec {
            name: names.subscriptions.clone(),
            hash_key: KeyAttribute::string("email"),
            range_key: Some(KeyAttribute::string("musicId")),
            indexes: Vec::new(),
            read_units: names.read_units,
            write_units: names.write_units,
        },
        TableSpec {
            name: names.music.clone(),
            hash_key: KeyAttribute::string("title"),
            range_key: Some(KeyAttribute::string("artist")),
            indexes: vec![IndexSpec {
                name: "user_email-index".to_string(),
                hash_key: KeyAttribute::string("user_email"),
            }],
            read_units: names.read_units,
            write_units: names.write_units,
        },
    ]
}
