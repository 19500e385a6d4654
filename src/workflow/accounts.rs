use tracing::info;

use crate::config::Config;
use crate::table_store::TableStore;

use super::fixtures::ACCOUNTS;

/// Insert the fixed account records into the login table.
pub(crate) async fn run(config: &Config, tables: &dyn TableStore) -> anyhow::Result<usize> {
    for account in &ACCOUNTS {
        tables
            .put_item(&config.tables.login, account.to_item())
            .await?;
    }
    info!(
        count = ACCOUNTS.len(),
        table = %config.tables.login,
        "Seeded account records"
    );
    Ok(ACCOUNTS.len())
}
