use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::fetch::ImageFetcher;
use crate::object_store::ObjectStore;
use crate::table_store::TableStore;

use super::fixtures;

#[derive(Debug, Default)]
pub(crate) struct CatalogCounts {
    pub records: usize,
    pub uploads: usize,
}

/// Create the image bucket. A name collision surfaces as
/// `ObjectStoreError::BucketTaken`.
pub(crate) async fn create_bucket(
    config: &Config,
    objects: &dyn ObjectStore,
) -> anyhow::Result<()> {
    let bucket = config.bucket.name();
    info!(bucket = %bucket, "Creating bucket");
    objects.create_bucket(&bucket).await?;
    info!(bucket = %bucket, "Bucket created");
    Ok(())
}

/// Seed the music table from the descriptor file, mirroring each entry's
/// image into the bucket when its fetch succeeds.
pub(crate) async fn seed(
    config: &Config,
    tables: &dyn TableStore,
    objects: &dyn ObjectStore,
    fetcher: &dyn ImageFetcher,
) -> anyhow::Result<CatalogCounts> {
    let bucket = config.bucket.name();

    let raw = tokio::fs::read_to_string(&config.catalog_file)
        .await
        .with_context(|| format!("Failed to read catalog descriptor '{}'", config.catalog_file))?;
    let entries = fixtures::parse_catalog(&raw)
        .with_context(|| format!("Failed to parse catalog descriptor '{}'", config.catalog_file))?;

    let mut counts = CatalogCounts::default();
    for mut entry in entries {
        match fetcher.fetch(&entry.img_url).await? {
            Some(data) => {
                let key = entry.image_key().to_string();
                objects.put_object(&bucket, &key, data).await?;
                info!(bucket = %bucket, key = %key, "Uploaded image");
                // The record now points at the bucket-hosted copy
                entry.img_url = objects.public_url(&bucket, &key);
                counts.uploads += 1;
            }
            None => {
                info!(url = %entry.img_url, "Image fetch returned non-OK, keeping original URL");
            }
        }
        tables
            .put_item(&config.tables.music, entry.to_item())
            .await?;
        counts.records += 1;
    }

    info!(
        records = counts.records,
        uploads = counts.uploads,
        "Catalog seeded"
    );
    Ok(counts)
}
