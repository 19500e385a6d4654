use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use music_bootstrap::aws::Credentials;
use music_bootstrap::config::{
    AwsConfig, BucketConfig, Config, StagePolicies, StoreBackend, TableNames, WaitConfig,
};
use music_bootstrap::fetch::{FetchError, ImageFetcher};
use music_bootstrap::object_store::{MemoryObjectStore, ObjectStore, ObjectStoreError};
use music_bootstrap::table_store::{
    AttrValue, Item, MemoryTableStore, TableSpec, TableStatus, TableStore, TableStoreError,
};
use music_bootstrap::workflow::{self, parse_catalog};

fn test_config(catalog_file: &str) -> Config {
    Config {
        aws: AwsConfig {
            region: "us-east-1".to_string(),
            credentials: Credentials {
                access_key_id: String::new(),
                secret_access_key: String::new(),
                session_token: None,
            },
        },
        backend: StoreBackend::Memory,
        bucket: BucketConfig {
            base_name: "music-app-images".to_string(),
            suffix: "test".to_string(),
        },
        catalog_file: catalog_file.to_string(),
        policies: StagePolicies::default(),
        tables: TableNames::default(),
        waits: WaitConfig {
            conflict_retry_ms: 1,
            poll_initial_ms: 1,
            poll_max_ms: 2,
            poll_max_attempts: 5,
        },
    }
}

fn write_catalog(dir: &tempfile::TempDir, contents: &str) -> String {
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

/// Serves canned bodies for known URLs with status 200; everything else is a 404.
#[derive(Default)]
struct StubFetcher {
    responses: HashMap<String, Bytes>,
}

impl StubFetcher {
    fn with(mut self, url: &str, body: &'static [u8]) -> Self {
        self.responses.insert(url.to_string(), Bytes::from(body));
        self
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, FetchError> {
        Ok(self.responses.get(url).cloned())
    }
}

/// Fails every fetch at the transport level.
struct DownFetcher;

#[async_trait]
impl ImageFetcher for DownFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, FetchError> {
        Err(FetchError::Transport(format!("connection refused: {url}")))
    }
}

fn attr_s(item: &Item, name: &str) -> String {
    match item.get(name) {
        Some(AttrValue::S(s)) => s.clone(),
        other => panic!("expected string attribute '{name}', got {other:?}"),
    }
}

const TWO_ENTRY_CATALOG: &str = r#"{
  "songs": [
    {
      "title": "A",
      "artist": "B",
      "year": 2000,
      "web_url": "http://x",
      "img_url": "http://y/pic.jpg"
    },
    {
      "title": "C",
      "artist": "D",
      "year": 2001,
      "web_url": "http://x2",
      "img_url": "http://y/missing.jpg"
    }
  ]
}"#;

#[tokio::test]
async fn test_full_run_seeds_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, TWO_ENTRY_CATALOG));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();
    let fetcher = StubFetcher::default().with("http://y/pic.jpg", b"IMG");

    let report = workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();

    assert_eq!(report.tables_deleted, 0);
    assert_eq!(report.buckets_deleted, 0);
    assert_eq!(report.tables_created, 3);
    assert_eq!(report.accounts_seeded, 10);
    assert_eq!(report.images_uploaded, 1);
    assert_eq!(report.catalog_records, 2);

    assert_eq!(
        tables.table_names(),
        vec![
            "login".to_string(),
            "music".to_string(),
            "subscriptions".to_string()
        ]
    );
    assert_eq!(objects.bucket_names(), vec!["music-app-images-test".to_string()]);

    // Every table reports ACTIVE after the run
    for name in ["login", "music", "subscriptions"] {
        assert_eq!(
            tables.table_status(name).await.unwrap(),
            Some(TableStatus::Active)
        );
    }
}

#[tokio::test]
async fn test_account_seed_is_ten_unique_emails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, r#"{"songs": []}"#));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();
    let fetcher = StubFetcher::default();

    workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();

    let items = tables.items("login");
    assert_eq!(items.len(), 10);

    let mut emails: Vec<String> = items.iter().map(|i| attr_s(i, "email")).collect();
    emails.sort();
    emails.dedup();
    assert_eq!(emails.len(), 10);
}

#[tokio::test]
async fn test_rerun_tears_down_and_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, TWO_ENTRY_CATALOG));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();
    let fetcher = StubFetcher::default().with("http://y/pic.jpg", b"IMG");

    workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();
    let second = workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();

    // The second run removed everything the first run made
    assert_eq!(second.tables_deleted, 3);
    assert_eq!(second.buckets_deleted, 1);

    // No duplication, no accumulation
    assert_eq!(tables.items("login").len(), 10);
    assert_eq!(tables.items("music").len(), 2);
    assert_eq!(objects.bucket_names(), vec!["music-app-images-test".to_string()]);
}

#[tokio::test]
async fn test_image_url_rewritten_on_ok_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, TWO_ENTRY_CATALOG));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();
    let fetcher = StubFetcher::default().with("http://y/pic.jpg", b"IMG");

    workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();

    assert_eq!(
        objects.object("music-app-images-test", "pic.jpg"),
        Some(Bytes::from("IMG"))
    );

    let items = tables.items("music");
    let record = items.iter().find(|i| attr_s(i, "title") == "A").unwrap();
    assert_eq!(
        attr_s(record, "img_url"),
        "https://music-app-images-test.s3.amazonaws.com/pic.jpg"
    );
    assert_eq!(attr_s(record, "web_url"), "http://x");
    assert_eq!(record.get("year"), Some(&AttrValue::N("2000".to_string())));
}

#[tokio::test]
async fn test_image_url_kept_on_failed_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, TWO_ENTRY_CATALOG));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();
    let fetcher = StubFetcher::default().with("http://y/pic.jpg", b"IMG");

    workflow::run(&config, &tables, &objects, &fetcher)
        .await
        .unwrap();

    // The 404 entry was inserted anyway, with its original URL
    assert_eq!(objects.object("music-app-images-test", "missing.jpg"), None);
    let items = tables.items("music");
    let record = items.iter().find(|i| attr_s(i, "title") == "C").unwrap();
    assert_eq!(attr_s(record, "img_url"), "http://y/missing.jpg");
}

#[tokio::test]
async fn test_transport_failure_aborts_catalog_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, TWO_ENTRY_CATALOG));
    let tables = MemoryTableStore::new();
    let objects = MemoryObjectStore::new();

    let result = workflow::run(&config, &tables, &objects, &DownFetcher).await;
    assert!(result.is_err());
}

/// Table store whose first delete reports an in-progress conflict.
struct FlakyDeleteStore {
    inner: MemoryTableStore,
    delete_calls: AtomicUsize,
}

impl FlakyDeleteStore {
    fn new(inner: MemoryTableStore) -> Self {
        Self {
            inner,
            delete_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TableStore for FlakyDeleteStore {
    async fn list_tables(&self) -> Result<Vec<String>, TableStoreError> {
        self.inner.list_tables().await
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), TableStoreError> {
        self.inner.create_table(spec).await
    }

    async fn delete_table(&self, name: &str) -> Result<(), TableStoreError> {
        if self.delete_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(TableStoreError::InUse(name.to_string()));
        }
        self.inner.delete_table(name).await
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, TableStoreError> {
        self.inner.table_status(name).await
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableStoreError> {
        self.inner.put_item(table, item).await
    }
}

#[tokio::test]
async fn test_teardown_retries_once_after_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, r#"{"songs": []}"#));

    let inner = MemoryTableStore::new();
    inner
        .create_table(&TableSpec {
            name: "stale".to_string(),
            hash_key: music_bootstrap::table_store::KeyAttribute::string("id"),
            range_key: None,
            indexes: Vec::new(),
            read_units: 5,
            write_units: 5,
        })
        .await
        .unwrap();
    let tables = FlakyDeleteStore::new(inner);
    let objects = MemoryObjectStore::new();

    let report = workflow::run(&config, &tables, &objects, &StubFetcher::default())
        .await
        .unwrap();

    assert_eq!(report.tables_deleted, 1);
    // One conflicted call plus the single retry
    assert_eq!(tables.delete_calls.load(Ordering::SeqCst), 2);
}

/// Object store that rejects every bucket creation as a name collision.
struct TakenBucketStore {
    inner: MemoryObjectStore,
}

#[async_trait]
impl ObjectStore for TakenBucketStore {
    async fn list_buckets(&self) -> Result<Vec<String>, ObjectStoreError> {
        self.inner.list_buckets().await
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::BucketTaken(bucket.to_string()))
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete_bucket(bucket).await
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        self.inner.list_objects(bucket).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<(), ObjectStoreError> {
        self.inner.put_object(bucket, key, data).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete_object(bucket, key).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.inner.public_url(bucket, key)
    }
}

#[tokio::test]
async fn test_bucket_collision_is_fatal_and_named() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&write_catalog(&dir, r#"{"songs": []}"#));
    let tables = MemoryTableStore::new();
    let objects = TakenBucketStore {
        inner: MemoryObjectStore::new(),
    };

    let err = workflow::run(&config, &tables, &objects, &StubFetcher::default())
        .await
        .unwrap_err();
    let rendered = format!("{err:#}");
    assert!(rendered.contains("already taken"), "got: {rendered}");
    assert!(rendered.contains("music-app-images-test"), "got: {rendered}");
}

#[test]
fn test_parse_catalog_wrapped_form() {
    let entries = parse_catalog(TWO_ENTRY_CATALOG).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "A");
    assert_eq!(entries[0].artist, "B");
    assert_eq!(entries[0].year, 2000);
}

#[test]
fn test_parse_catalog_bare_list() {
    let entries = parse_catalog(
        r#"[{"title": "A", "artist": "B", "year": 2000, "web_url": "http://x", "img_url": "http://y/pic.jpg"}]"#,
    )
    .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].image_key(), "pic.jpg");
}

#[test]
fn test_image_key_is_last_path_segment() {
    let entry = workflow::CatalogEntry {
        title: "A".to_string(),
        artist: "B".to_string(),
        year: 2000,
        web_url: "http://x".to_string(),
        img_url: "http://cdn.example.com/art/covers/pic.jpg".to_string(),
    };
    assert_eq!(entry.image_key(), "pic.jpg");
}

#[test]
fn test_table_specs_schemas() {
    let specs = workflow::table_specs(&TableNames::default());
    assert_eq!(specs.len(), 3);

    let login = &specs[0];
    assert_eq!(login.name, "login");
    assert_eq!(login.hash_key.name, "email");
    assert!(login.range_key.is_none());
    assert!(login.indexes.is_empty());

    let subscriptions = &specs[1];
    assert_eq!(subscriptions.hash_key.name, "email");
    assert_eq!(subscriptions.range_key.as_ref().unwrap().name, "musicId");

    let music = &specs[2];
    assert_eq!(music.hash_key.name, "title");
    assert_eq!(music.range_key.as_ref().unwrap().name, "artist");
    assert_eq!(music.indexes.len(), 1);
    assert_eq!(music.indexes[0].name, "user_email-index");
    assert_eq!(music.indexes[0].hash_key.name, "user_email");
}
