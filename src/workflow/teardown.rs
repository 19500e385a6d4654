use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{Config, FailurePolicy};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::table_store::{self, TableStore, TableStoreError};

#[derive(Debug, Default)]
pub(crate) struct TeardownCounts {
    pub buckets: usize,
    pub tables: usize,
}

/// Delete every table, then every object and bucket, in the target account.
///
/// The stage's failure policy applies per resource, not just per stage.
pub(crate) async fn run(
    config: &Config,
    tables: &dyn TableStore,
    objects: &dyn ObjectStore,
) -> anyhow::Result<TeardownCounts> {
    warn!(
        "Teardown deletes EVERY table and bucket in the target account/region, \
         not just this workflow's resources"
    );

    let policy = config.policies.teardown;
    let mut counts = TeardownCounts::default();

    let table_names = match tables.list_tables().await {
        Ok(names) => names,
        Err(e) => {
            check(policy, "Failed to list tables", e)?;
            Vec::new()
        }
    };
    for name in table_names {
        match delete_table(config, tables, &name).await {
            Ok(()) => counts.tables += 1,
            Err(e) => check(policy, &format!("Failed to delete table '{name}'"), e)?,
        }
    }

    let bucket_names = match objects.list_buckets().await {
        Ok(names) => names,
        Err(e) => {
            check(policy, "Failed to list buckets", e)?;
            Vec::new()
        }
    };
    for name in bucket_names {
        match delete_bucket(objects, &name).await {
            Ok(()) => counts.buckets += 1,
            Err(e) => check(policy, &format!("Failed to delete bucket '{name}'"), e)?,
        }
    }

    Ok(counts)
}

/// Delete one table and wait for it to be gone. A delete-in-progress
/// conflict gets a fixed delay and a single retry before the wait.
async fn delete_table(
    config: &Config,
    store: &dyn TableStore,
    name: &str,
) -> Result<(), TableStoreError> {
    info!(table = %name, "Deleting table");
    match store.delete_table(name).await {
        Ok(()) => {}
        Err(TableStoreError::InUse(_)) => {
            info!(table = %name, "Delete already in progress, retrying after delay");
            tokio::time::sleep(Duration::from_millis(config.waits.conflict_retry_ms)).await;
            match store.delete_table(name).await {
                Ok(()) => {}
                // Still draining, or gone in the meantime -- the wait below settles it
                Err(TableStoreError::InUse(_)) | Err(TableStoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Err(e) => return Err(e),
    }
    table_store::wait_until_gone(store, name, &config.waits).await?;
    info!(table = %name, "Deleted table");
    Ok(())
}

/// Empty one bucket, then delete it.
async fn delete_bucket(objects: &dyn ObjectStore, name: &str) -> Result<(), ObjectStoreError> {
    for key in objects.list_objects(name).await? {
        objects.delete_object(name, &key).await?;
        info!(bucket = %name, key = %key, "Deleted object");
    }
    objects.delete_bucket(name).await?;
    info!(bucket = %name, "Deleted bucket");
    Ok(())
}

fn check<E>(policy: FailurePolicy, context: &str, err: E) -> anyhow::Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match policy {
        FailurePolicy::Abort => Err(anyhow::Error::new(err).context(context.to_string())),
        FailurePolicy::Continue => {
            error!(error = %err, "{context}, continuing");
            Ok(())
        }
    }
}
