#![allow(dead_code)]

//! Behaviour every storage backend must share.

use url_shortener_core::AppError;
use url_shortener_core::domain::entities::UrlRecord;
use url_shortener_core::domain::repositories::UrlStorage;

pub fn record(id: &str, url: &str, owner: &str) -> UrlRecord {
    UrlRecord::new(id.to_string(), url.to_string(), owner.to_string())
}

pub fn ids(records: &[UrlRecord]) -> Vec<String> {
    let mut ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids
}

pub async fn check_save_conflict_keeps_first(storage: &dyn UrlStorage) {
    let inserted = storage
        .save(record("aaaa0000", "https://first.io", "u1"))
        .await
        .unwrap();
    assert!(inserted);

    // Identical record is a no-op.
    let inserted = storage
        .save(record("aaaa0000", "https://first.io", "u1"))
        .await
        .unwrap();
    assert!(!inserted);

    let err = storage
        .save(record("aaaa0000", "https://second.io", "u1"))
        .await
        .unwrap_err();
    match err {
        AppError::Conflict { ids, .. } => assert_eq!(ids, vec!["aaaa0000".to_string()]),
        other => panic!("expected conflict, got {other:?}"),
    }

    let err = storage
        .save(record("aaaa0000", "https://first.io", "u2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));

    let stored = storage.get("aaaa0000").await.unwrap().unwrap();
    assert_eq!(stored.original_url, "https://first.io");
    assert_eq!(stored.owner_id, "u1");
}

pub async fn check_batch_partial_conflict(storage: &dyn UrlStorage) {
    storage
        .save(record("bbbb0002", "https://existing.io", "u1"))
        .await
        .unwrap();

    let err = storage
        .save_batch(vec![
            record("bbbb0001", "https://one.io", "u1"),
            record("bbbb0002", "https://two.io", "u1"),
            record("bbbb0003", "https://three.io", "u1"),
        ])
        .await
        .unwrap_err();

    match err {
        AppError::Conflict { ids, .. } => assert_eq!(ids, vec!["bbbb0002".to_string()]),
        other => panic!("expected conflict, got {other:?}"),
    }

    for (id, url) in [
        ("bbbb0001", "https://one.io"),
        ("bbbb0002", "https://existing.io"),
        ("bbbb0003", "https://three.io"),
    ] {
        let stored = storage.get(id).await.unwrap().unwrap();
        assert_eq!(stored.original_url, url, "record {id}");
    }
}

pub async fn check_batch_identical_records_are_not_conflicts(storage: &dyn UrlStorage) {
    storage
        .save(record("cccc0001", "https://same.io", "u1"))
        .await
        .unwrap();

    storage
        .save_batch(vec![
            record("cccc0001", "https://same.io", "u1"),
            record("cccc0002", "https://new.io", "u1"),
        ])
        .await
        .unwrap();

    assert!(storage.get("cccc0002").await.unwrap().is_some());
}

pub async fn check_get_missing(storage: &dyn UrlStorage) {
    assert!(storage.get("ffffffff").await.unwrap().is_none());
}

pub async fn check_user_isolation(storage: &dyn UrlStorage) {
    storage
        .save_batch(vec![
            record("dddd0001", "https://a.io", "alice"),
            record("dddd0002", "https://b.io", "bob"),
            record("dddd0003", "https://c.io", "alice"),
        ])
        .await
        .unwrap();

    let alice = storage.get_user_urls("alice").await.unwrap();
    assert_eq!(ids(&alice), vec!["dddd0001", "dddd0003"]);
    assert!(alice.iter().all(|r| r.owner_id == "alice"));

    let bob = storage.get_user_urls("bob").await.unwrap();
    assert_eq!(ids(&bob), vec!["dddd0002"]);

    assert!(storage.get_user_urls("carol").await.unwrap().is_empty());
}

pub async fn check_delete_scoped_to_owner(storage: &dyn UrlStorage) {
    storage
        .save_batch(vec![
            record("eeee0001", "https://a.io", "alice"),
            record("eeee0002", "https://b.io", "bob"),
        ])
        .await
        .unwrap();

    let targets = vec![
        "eeee0001".to_string(),
        "eeee0002".to_string(),
        "eeee9999".to_string(),
    ];
    storage.delete_user_urls("alice", &targets).await.unwrap();

    assert!(storage.get("eeee0001").await.unwrap().unwrap().deleted);
    assert!(!storage.get("eeee0002").await.unwrap().unwrap().deleted);

    // Repeating the deletion changes nothing.
    storage.delete_user_urls("alice", &targets).await.unwrap();
    assert!(storage.get("eeee0001").await.unwrap().unwrap().deleted);

    // Deleted records stay enumerable.
    let alice = storage.get_user_urls("alice").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert!(alice[0].deleted);

    // Re-saving the live form does not resurrect the record.
    assert!(
        storage
            .save(record("eeee0001", "https://a.io", "alice"))
            .await
            .is_err()
    );
    assert!(storage.get("eeee0001").await.unwrap().unwrap().deleted);
}
