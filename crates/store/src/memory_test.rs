//! Tests for the in-memory store

use super::*;
use crate::Operation;
use std::sync::Arc;

fn batch_of(ops: Vec<Operation>) -> Batch {
    ops.into_iter().collect()
}

#[tokio::test]
async fn test_submit_applies_operations() {
    let store = MemoryStore::new();
    let batch = batch_of(vec![
        Operation::index("logs-1", "{\"n\":1}").with_id("a"),
        Operation::create("logs-1", "{\"n\":2}").with_id("b"),
        Operation::index("logs-1", "{\"n\":3}"),
    ]);

    let response = store.submit_batch(batch).await.unwrap();

    assert_eq!(response.items.len(), 3);
    assert!(!response.has_failures());
    assert_eq!(store.document_count("logs-1"), 3);
    assert_eq!(
        store.document("logs-1", "a"),
        Some(Bytes::from_static(b"{\"n\":1}"))
    );
    // store-assigned id is reported back
    assert!(!response.items[2].id.is_empty());
}

#[tokio::test]
async fn test_create_conflict_is_item_failure() {
    let store = MemoryStore::new();
    store
        .submit_batch(batch_of(vec![Operation::create("logs", "x").with_id("1")]))
        .await
        .unwrap();

    let response = store
        .submit_batch(batch_of(vec![
            Operation::create("logs", "y").with_id("1"),
            Operation::index("logs", "z").with_id("2"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.failed_count(), 1);
    assert_eq!(response.succeeded_count(), 1);
}

#[tokio::test]
async fn test_delete_removes_document() {
    let store = MemoryStore::new();
    store
        .submit_batch(batch_of(vec![Operation::index("logs", "x").with_id("1")]))
        .await
        .unwrap();
    store
        .submit_batch(batch_of(vec![Operation::delete("logs", "1")]))
        .await
        .unwrap();

    assert_eq!(store.document_count("logs"), 0);
}

#[tokio::test]
async fn test_failed_batch_injection() {
    let store = MemoryStore::new().with_failed_batch(2);
    let op = || batch_of(vec![Operation::index("logs", "x")]);

    assert!(store.submit_batch(op()).await.is_ok());
    assert!(matches!(
        store.submit_batch(op()).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(store.submit_batch(op()).await.is_ok());

    let sequences: Vec<u64> = store.batches().iter().map(|b| b.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_failed_document_injection() {
    let store = MemoryStore::new().with_failed_document("bad");
    let response = store
        .submit_batch(batch_of(vec![
            Operation::index("logs", "x").with_id("good"),
            Operation::index("logs", "x").with_id("bad"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.failed_count(), 1);
    assert_eq!(store.document_count("logs"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_peak_in_flight() {
    let store = Arc::new(MemoryStore::new().with_delay(Duration::from_millis(100)));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .submit_batch(batch_of(vec![Operation::index("logs", "x")]))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.peak_in_flight(), 3);
    assert_eq!(store.batches().len(), 3);
}

#[tokio::test]
async fn test_get_aliases_by_pattern() {
    let store = MemoryStore::new();
    store.add_alias("logs", "logs-5");
    store.add_alias("logs-current", "logs-5");
    store.add_alias("metrics", "metrics-1");

    let exact = store.get_aliases("logs").await.unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(
        exact["logs-5"],
        BTreeSet::from(["logs".to_string()])
    );

    let wildcard = store.get_aliases("logs*").await.unwrap();
    assert_eq!(wildcard["logs-5"].len(), 2);

    assert!(store.get_aliases("absent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_aliases_is_atomic() {
    let store = MemoryStore::new();
    store.add_collections(["logs-9"]);
    store.add_alias("logs", "logs-5");

    // unknown target: nothing applied
    let result = store
        .update_aliases(&[
            AliasAction::remove("logs", "logs-5"),
            AliasAction::add("logs", "logs-404"),
        ])
        .await;
    assert!(matches!(result, Err(StoreError::CollectionNotFound(_))));
    assert_eq!(store.alias_targets("logs"), vec!["logs-5"]);

    let acknowledged = store
        .update_aliases(&[
            AliasAction::remove("logs", "logs-5"),
            AliasAction::add("logs", "logs-9"),
        ])
        .await
        .unwrap();
    assert!(acknowledged);
    assert_eq!(store.alias_targets("logs"), vec!["logs-9"]);
}

#[tokio::test]
async fn test_delete_collections() {
    let store = MemoryStore::new();
    store.add_collections(["a", "b", "c"]);

    assert!(
        store
            .delete_collections(&["a".into(), "b".into()])
            .await
            .unwrap()
    );
    assert_eq!(store.list_collections().await.unwrap(), vec!["c"]);

    assert!(matches!(
        store.delete_collections(&["zzz".into()]).await,
        Err(StoreError::CollectionNotFound(_))
    ));
}

#[tokio::test]
async fn test_unacknowledged_deletes_keep_collections() {
    let store = MemoryStore::new().with_unacknowledged_deletes();
    store.add_collections(["a"]);

    assert!(!store.delete_collections(&["a".into()]).await.unwrap());
    assert!(store.has_collection("a"));
}

#[tokio::test]
async fn test_collection_settings() {
    let store = MemoryStore::new();
    store.create_collection("logs-1").await.unwrap();
    assert!(store.create_collection("logs-1").await.is_err());

    assert_eq!(
        store.refresh_interval("logs-1"),
        Some(Some(DEFAULT_REFRESH_INTERVAL))
    );
    store.set_refresh_interval("logs-1", None).await.unwrap();
    assert_eq!(store.refresh_interval("logs-1"), Some(None));

    store.set_replica_count("logs-1", 0).await.unwrap();
    assert_eq!(store.replica_count("logs-1"), Some(0));

    assert!(store.set_replica_count("nope", 1).await.is_err());
    assert!(store.refresh("logs-1").await.is_ok());
    assert!(store.refresh("nope").await.is_err());
}
