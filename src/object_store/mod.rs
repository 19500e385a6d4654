mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Bucket name already taken: {0}")]
    BucketTaken(String),
    #[error("Bucket not found: {0}")]
    NotFound(String),
}

/// Abstraction over bucket-level object storage.
/// Keys are filenames derived from source image URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>, ObjectStoreError>;
    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;
    /// Delete a bucket. The bucket must already be empty.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError>;
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<(), ObjectStoreError>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
    /// Public HTTPS URL serving the object after upload.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}
