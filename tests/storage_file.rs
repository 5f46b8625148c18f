mod common;

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use url_shortener_core::AppError;
use url_shortener_core::domain::repositories::UrlStorage;
use url_shortener_core::infrastructure::persistence::FileUrlStorage;

async fn open_temp() -> (TempDir, FileUrlStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileUrlStorage::open(dir.path().join("urls.jsonl"))
        .await
        .unwrap();
    (dir, storage)
}

fn journal_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_save_conflict_keeps_first() {
    let (_dir, storage) = open_temp().await;
    common::check_save_conflict_keeps_first(&storage).await;
}

#[tokio::test]
async fn test_batch_partial_conflict() {
    let (_dir, storage) = open_temp().await;
    common::check_batch_partial_conflict(&storage).await;
}

#[tokio::test]
async fn test_batch_identical_records() {
    let (_dir, storage) = open_temp().await;
    common::check_batch_identical_records_are_not_conflicts(&storage).await;
}

#[tokio::test]
async fn test_get_missing() {
    let (_dir, storage) = open_temp().await;
    common::check_get_missing(&storage).await;
}

#[tokio::test]
async fn test_user_isolation() {
    let (_dir, storage) = open_temp().await;
    common::check_user_isolation(&storage).await;
}

#[tokio::test]
async fn test_delete_scoped_to_owner() {
    let (_dir, storage) = open_temp().await;
    common::check_delete_scoped_to_owner(&storage).await;
}

#[tokio::test]
async fn test_open_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("urls.jsonl");

    let storage = FileUrlStorage::open(&path).await.unwrap();

    assert!(path.exists());
    assert_eq!(storage.path(), path.as_path());
}

#[tokio::test]
async fn test_reopen_replays_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.jsonl");

    {
        let storage = FileUrlStorage::open(&path).await.unwrap();
        storage
            .save_batch(vec![
                common::record("aaaa0001", "https://a.io", "u1"),
                common::record("aaaa0002", "https://b.io", "u1"),
            ])
            .await
            .unwrap();
        storage
            .delete_user_urls("u1", &["aaaa0002".to_string()])
            .await
            .unwrap();
    }

    let reopened = FileUrlStorage::open(&path).await.unwrap();

    let live = reopened.get("aaaa0001").await.unwrap().unwrap();
    assert_eq!(live.original_url, "https://a.io");
    assert!(!live.deleted);
    assert!(reopened.get("aaaa0002").await.unwrap().unwrap().deleted);

    // The replayed index still detects conflicts.
    let err = reopened
        .save(common::record("aaaa0001", "https://other.io", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[tokio::test]
async fn test_every_change_appends_a_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.jsonl");
    let storage = FileUrlStorage::open(&path).await.unwrap();

    storage
        .save(common::record("aaaa0001", "https://a.io", "u1"))
        .await
        .unwrap();
    assert_eq!(journal_lines(&path).len(), 1);

    // Identical re-save and rejected conflict write nothing.
    storage
        .save(common::record("aaaa0001", "https://a.io", "u1"))
        .await
        .unwrap();
    let _ = storage
        .save(common::record("aaaa0001", "https://b.io", "u1"))
        .await;
    assert_eq!(journal_lines(&path).len(), 1);

    storage
        .delete_user_urls("u1", &["aaaa0001".to_string()])
        .await
        .unwrap();

    let lines = journal_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        r#"{"id":"aaaa0001","url":"https://a.io","user_id":"u1","deleted":false}"#
    );
    assert_eq!(
        lines[1],
        r#"{"id":"aaaa0001","url":"https://a.io","user_id":"u1","deleted":true}"#
    );
}

#[tokio::test]
async fn test_torn_tail_is_dropped_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.jsonl");

    let complete = r#"{"id":"aaaa0001","url":"https://a.io","user_id":"u1","deleted":false}"#;
    std::fs::write(&path, format!("{complete}\n{{\"id\":\"aaaa00")).unwrap();

    let storage = FileUrlStorage::open(&path).await.unwrap();
    assert!(storage.get("aaaa0001").await.unwrap().is_some());

    storage
        .save(common::record("aaaa0002", "https://b.io", "u1"))
        .await
        .unwrap();
    drop(storage);

    let lines = journal_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], complete);

    let reopened = FileUrlStorage::open(&path).await.unwrap();
    assert!(reopened.get("aaaa0002").await.unwrap().is_some());
}

#[tokio::test]
async fn test_corrupt_line_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.jsonl");

    let complete = r#"{"id":"aaaa0001","url":"https://a.io","user_id":"u1","deleted":false}"#;
    std::fs::write(&path, format!("garbage\n{complete}\n")).unwrap();

    let err = FileUrlStorage::open(&path).await.err().unwrap();
    assert!(matches!(err, AppError::Storage { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_replay_consistently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.jsonl");
    let storage = Arc::new(FileUrlStorage::open(&path).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..40 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("{:08x}", i);
            storage
                .save(common::record(&id, &format!("https://{i}.io"), "u1"))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(journal_lines(&path).len(), 40);

    let reopened = FileUrlStorage::open(&path).await.unwrap();
    assert_eq!(reopened.get_user_urls("u1").await.unwrap().len(), 40);
}
