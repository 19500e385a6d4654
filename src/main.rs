use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use music_bootstrap::{
    config::{Config, StoreBackend},
    fetch::HttpFetcher,
    object_store as obj,
    table_store as tbl,
    workflow,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "music-bootstrap starting");

    // Load configuration
    let config = Config::load()?;
    info!(
        region = %config.aws.region,
        bucket = %config.bucket.name(),
        "Loaded configuration"
    );

    // Initialize store backends
    let tables: Arc<dyn tbl::TableStore>;
    let objects: Arc<dyn obj::ObjectStore>;
    match config.backend {
        StoreBackend::Aws => {
            tables = Arc::new(tbl::DynamoStore::new(
                &config.aws.region,
                config.aws.credentials.clone(),
            )?);
            objects = Arc::new(obj::S3Store::new(
                &config.aws.region,
                config.aws.credentials.clone(),
            )?);
            info!("Using AWS backends (DynamoDB, S3)");
        }
        StoreBackend::Memory => {
            tables = Arc::new(tbl::MemoryTableStore::new());
            objects = Arc::new(obj::MemoryObjectStore::new());
            warn!("BACKEND=memory: dry run against in-memory stores");
        }
    }

    let fetcher = HttpFetcher::new()?;

    let report = workflow::run(&config, tables.as_ref(), objects.as_ref(), &fetcher).await?;

    info!(
        tables_deleted = report.tables_deleted,
        buckets_deleted = report.buckets_deleted,
        tables_created = report.tables_created,
        accounts_seeded = report.accounts_seeded,
        images_uploaded = report.images_uploaded,
        catalog_records = report.catalog_records,
        "Bootstrap complete"
    );

    Ok(())
}
