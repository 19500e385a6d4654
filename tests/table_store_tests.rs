use music_bootstrap::config::WaitConfig;
use music_bootstrap::table_store::{
    wait_until_active, wait_until_gone, AttrValue, Item, KeyAttribute, MemoryTableStore,
    TableSpec, TableStatus, TableStore, TableStoreError,
};

fn fast_waits() -> WaitConfig {
    WaitConfig {
        conflict_retry_ms: 1,
        poll_initial_ms: 1,
        poll_max_ms: 2,
        poll_max_attempts: 3,
    }
}

fn spec(name: &str) -> TableSpec {
    TableSpec {
        name: name.to_string(),
        hash_key: KeyAttribute::string("email"),
        range_key: None,
        indexes: Vec::new(),
        read_units: 5,
        write_units: 5,
    }
}

fn item(email: &str, user_name: &str) -> Item {
    Item::from([
        ("email".to_string(), AttrValue::S(email.to_string())),
        ("user_name".to_string(), AttrValue::S(user_name.to_string())),
    ])
}

#[tokio::test]
async fn test_create_and_list_tables() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();
    store.create_table(&spec("music")).await.unwrap();

    let names = store.list_tables().await.unwrap();
    assert_eq!(names, vec!["login".to_string(), "music".to_string()]);
}

#[tokio::test]
async fn test_create_existing_table_is_in_use() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();

    let result = store.create_table(&spec("login")).await;
    assert!(matches!(result, Err(TableStoreError::InUse(_))));
}

#[tokio::test]
async fn test_delete_missing_table_not_found() {
    let store = MemoryTableStore::new();
    let result = store.delete_table("missing").await;
    assert!(matches!(result, Err(TableStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_table_status() {
    let store = MemoryTableStore::new();
    assert_eq!(store.table_status("login").await.unwrap(), None);

    store.create_table(&spec("login")).await.unwrap();
    assert_eq!(
        store.table_status("login").await.unwrap(),
        Some(TableStatus::Active)
    );
}

#[tokio::test]
async fn test_put_item_overwrites_on_key() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();

    store
        .put_item("login", item("user1@example.com", "First"))
        .await
        .unwrap();
    store
        .put_item("login", item("user1@example.com", "Second"))
        .await
        .unwrap();
    store
        .put_item("login", item("user2@example.com", "Other"))
        .await
        .unwrap();

    let items = store.items("login");
    assert_eq!(items.len(), 2);
    let first = items
        .iter()
        .find(|i| i.get("email") == Some(&AttrValue::S("user1@example.com".to_string())))
        .unwrap();
    assert_eq!(
        first.get("user_name"),
        Some(&AttrValue::S("Second".to_string()))
    );
}

#[tokio::test]
async fn test_put_item_into_missing_table() {
    let store = MemoryTableStore::new();
    let result = store.put_item("login", item("user1@example.com", "X")).await;
    assert!(matches!(result, Err(TableStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_wait_until_active() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();
    wait_until_active(&store, "login", &fast_waits())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_until_active_times_out() {
    let store = MemoryTableStore::new();
    let result = wait_until_active(&store, "missing", &fast_waits()).await;
    assert!(matches!(result, Err(TableStoreError::Timeout(_))));
}

#[tokio::test]
async fn test_wait_until_gone() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();
    store.delete_table("login").await.unwrap();
    wait_until_gone(&store, "login", &fast_waits())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_until_gone_times_out() {
    let store = MemoryTableStore::new();
    store.create_table(&spec("login")).await.unwrap();
    let result = wait_until_gone(&store, "login", &fast_waits()).await;
    assert!(matches!(result, Err(TableStoreError::Timeout(_))));
}
