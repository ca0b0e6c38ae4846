//! Deletion pipeline tests against real backends

use std::sync::Arc;
use std::time::Duration;

use shortener::deletion::{DeletionManager, DeletionSettings};
use shortener::errors::ShortenerError;
use shortener::storage::{Context, FileStorage, MemoryStorage, Storage, UrlEntry};
use tempfile::TempDir;

async fn seed(storage: &Arc<dyn Storage>, user: &str, codes: &[&str]) {
    let entries = codes
        .iter()
        .map(|c| UrlEntry::new(*c, format!("https://{user}/{c}")))
        .collect();
    storage
        .add_many(&Context::background(), entries, user)
        .await
        .unwrap();
}

async fn is_deleted(storage: &Arc<dyn Storage>, code: &str) -> bool {
    storage
        .get_by_short(&Context::background(), code)
        .await
        .unwrap()
        .deleted
}

#[tokio::test(start_paused = true)]
async fn timer_flush_reaches_memory_storage() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    seed(&storage, "alice", &["a", "b"]).await;

    let (manager, _worker) = DeletionManager::spawn(
        storage.clone(),
        DeletionSettings {
            capacity: 100,
            flush_interval: Duration::from_secs(10),
        },
    );

    manager
        .request_delete("alice", vec!["a".into(), "b".into()])
        .await
        .unwrap();

    // 未到周期，尚未刷盘
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!is_deleted(&storage, "a").await);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(is_deleted(&storage, "a").await);
    assert!(is_deleted(&storage, "b").await);
}

#[tokio::test]
async fn shutdown_drains_into_file_storage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&path).await.unwrap());
    seed(&storage, "alice", &["x1", "x2", "x3"]).await;
    seed(&storage, "bob", &["y1"]).await;

    let (manager, worker) = DeletionManager::spawn(
        storage.clone(),
        DeletionSettings {
            capacity: 1024,
            flush_interval: Duration::from_secs(3600),
        },
    );

    let other = manager.clone();
    manager
        .request_delete("alice", vec!["x1".into(), "x3".into()])
        .await
        .unwrap();
    // bob 不是 x2 的所有者
    other
        .request_delete("bob", vec!["x2".into(), "y1".into()])
        .await
        .unwrap();

    drop(manager);
    drop(other);
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker did not exit")
        .unwrap();

    let reopened: Arc<dyn Storage> = Arc::new(FileStorage::open(&path).await.unwrap());
    assert!(is_deleted(&reopened, "x1").await);
    assert!(!is_deleted(&reopened, "x2").await);
    assert!(is_deleted(&reopened, "x3").await);
    assert!(is_deleted(&reopened, "y1").await);
}

#[tokio::test]
async fn capacity_flush_without_timer() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    seed(&storage, "alice", &["c1", "c2", "c3", "c4"]).await;

    let (manager, _worker) = DeletionManager::spawn(
        storage.clone(),
        DeletionSettings {
            capacity: 2,
            flush_interval: Duration::from_secs(3600),
        },
    );

    manager
        .request_delete("alice", vec!["c1".into(), "c2".into()])
        .await
        .unwrap();

    // 缓冲区满即刷盘，不依赖定时器
    let mut flushed = false;
    for _ in 0..100 {
        if is_deleted(&storage, "c1").await && is_deleted(&storage, "c2").await {
            flushed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(flushed);
    assert!(!is_deleted(&storage, "c3").await);
}

#[tokio::test]
async fn closed_pipeline_rejects_requests() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let (manager, worker) = DeletionManager::spawn(storage, DeletionSettings::default());

    worker.abort();
    let _ = worker.await;

    let err = manager
        .request_delete("alice", vec!["a".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::PipelineClosed(_)));
    assert!(manager.is_closed());
}
