mod accounts;
mod catalog;
pub mod fixtures;
mod schema;
mod teardown;

pub use fixtures::{parse_catalog, Account, CatalogEntry, ACCOUNTS};
pub use schema::table_specs;

use tracing::error;

use crate::config::{Config, FailurePolicy};
use crate::fetch::ImageFetcher;
use crate::object_store::ObjectStore;
use crate::table_store::TableStore;

/// Counts observed across one full run.
#[derive(Debug, Default)]
pub struct Report {
    pub accounts_seeded: usize,
    pub buckets_deleted: usize,
    pub catalog_records: usize,
    pub images_uploaded: usize,
    pub tables_created: usize,
    pub tables_deleted: usize,
}

/// Run the five bootstrap stages in order: teardown, schema, account seed,
/// bucket creation, catalog seed. Each stage's failure policy comes from the
/// config.
pub async fn run(
    config: &Config,
    tables: &dyn TableStore,
    objects: &dyn ObjectStore,
    fetcher: &dyn ImageFetcher,
) -> anyhow::Result<Report> {
    let mut report = Report::default();

    match teardown::run(config, tables, objects).await {
        Ok(counts) => {
            report.tables_deleted = counts.tables;
            report.buckets_deleted = counts.buckets;
        }
        Err(e) => apply(config.policies.teardown, "teardown", e)?,
    }

    match schema::run(config, tables).await {
        Ok(count) => report.tables_created = count,
        Err(e) => apply(config.policies.schema, "schema", e)?,
    }

    match accounts::run(config, tables).await {
        Ok(count) => report.accounts_seeded = count,
        Err(e) => apply(config.policies.accounts, "accounts", e)?,
    }

    match catalog::create_bucket(config, objects).await {
        Ok(()) => {}
        Err(e) => apply(config.policies.bucket, "bucket", e)?,
    }

    match catalog::seed(config, tables, objects, fetcher).await {
        Ok(counts) => {
            report.catalog_records = counts.records;
            report.images_uploaded = counts.uploads;
        }
        Err(e) => apply(config.policies.catalog, "catalog", e)?,
    }

    Ok(report)
}

fn apply(policy: FailurePolicy, stage: &str, err: anyhow::Error) -> anyhow::Result<()> {
    match policy {
        FailurePolicy::Abort => Err(err.context(format!("Stage '{stage}' failed"))),
        FailurePolicy::Continue => {
            error!(stage, error = %err, "Stage failed, continuing");
            Ok(())
        }
    }
}
