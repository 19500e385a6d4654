use std::collections::BTreeMap;
use std::sync::Mutex;

use bytes::Bytes;

use super::{ObjectStore, ObjectStoreError};

/// In-memory object store for dry runs and tests.
///
/// Public URLs use the real store's shape so a dry run produces the same
/// seeded records as a live run.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of an object, if the bucket and key exist.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }

    /// Names of all existing buckets, sorted.
    pub fn bucket_names(&self) -> Vec<String> {
        let buckets = self.buckets.lock().unwrap();
        buckets.keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self.bucket_names())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(ObjectStoreError::BucketTaken(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::NotFound(bucket.to_string()))?;
        if !objects.is_empty() {
            return Err(ObjectStoreError::Backend(format!(
                "Bucket not empty: {bucket}"
            )));
        }
        buckets.remove(bucket);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::NotFound(bucket.to_string()))?;
        Ok(objects.keys().cloned().collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NotFound(bucket.to_string()))?;
        objects.remove(key);
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{bucket}.s3.amazonaws.com/{key}")
    }
}
