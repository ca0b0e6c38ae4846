//! Storage contract tests
//!
//! 同一组用例分别跑在内存、文件和 SQLite 三种后端上。

use std::sync::Arc;

use shortener::config::StorageConfig;
use shortener::errors::ShortenerError;
use shortener::storage::{
    Context, DatabaseStorage, DeletionRequest, FileStorage, MemoryStorage, Storage, UrlEntry,
};
use tempfile::TempDir;

// =============================================================================
// Backends
// =============================================================================

/// 后端实例；TempDir 需要与存储同生命周期
struct Backend {
    storage: Arc<dyn Storage>,
    _dir: Option<TempDir>,
}

fn memory_backend() -> Backend {
    Backend {
        storage: Arc::new(MemoryStorage::new()),
        _dir: None,
    }
}

async fn file_backend() -> Backend {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStorage::open(dir.path().join("urls.jsonl"))
        .await
        .expect("Failed to open file storage");
    Backend {
        storage: Arc::new(storage),
        _dir: Some(dir),
    }
}

async fn sqlite_backend() -> Backend {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("urls.db").display());
    let storage = DatabaseStorage::connect(&dsn, &StorageConfig::default())
        .await
        .expect("Failed to connect to SQLite");
    Backend {
        storage: Arc::new(storage),
        _dir: Some(dir),
    }
}

fn ctx() -> Context {
    Context::background()
}

// =============================================================================
// Contract
// =============================================================================

async fn add_then_lookup(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("abc", "https://example.com/a"), "alice")
        .await
        .unwrap();

    let by_short = storage.get_by_short(&ctx(), "abc").await.unwrap();
    assert_eq!(by_short.original_url, "https://example.com/a");
    assert_eq!(by_short.created_by, "alice");
    assert!(!by_short.deleted);

    let by_original = storage
        .get_by_original(&ctx(), "https://example.com/a")
        .await
        .unwrap();
    assert_eq!(by_original.short_url, "abc");

    assert!(matches!(
        storage.get_by_short(&ctx(), "missing").await,
        Err(ShortenerError::NotFound(_))
    ));
    assert!(matches!(
        storage.get_by_original(&ctx(), "https://nowhere").await,
        Err(ShortenerError::NotFound(_))
    ));
}

async fn duplicates_are_rejected(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("abc", "https://example.com/a"), "alice")
        .await
        .unwrap();

    // 同一 URL，换一个短码
    let err = storage
        .add(&ctx(), UrlEntry::new("xyz", "https://example.com/a"), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::NotUnique(_)), "{err:?}");

    // 同一短码，换一个 URL
    let err = storage
        .add(&ctx(), UrlEntry::new("abc", "https://example.com/b"), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::NotUnique(_)), "{err:?}");

    let entry = storage.get_by_short(&ctx(), "abc").await.unwrap();
    assert_eq!(entry.created_by, "alice");
}

async fn batch_is_all_or_nothing(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("a1", "https://one"), "alice")
        .await
        .unwrap();

    let err = storage
        .add_many(
            &ctx(),
            vec![
                UrlEntry::new("b1", "https://two"),
                UrlEntry::new("b2", "https://one"),
            ],
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::NotUnique(_)), "{err:?}");
    assert!(matches!(
        storage.get_by_short(&ctx(), "b1").await,
        Err(ShortenerError::NotFound(_))
    ));

    storage
        .add_many(
            &ctx(),
            vec![
                UrlEntry::new("b1", "https://two"),
                UrlEntry::new("b2", "https://three"),
            ],
            "bob",
        )
        .await
        .unwrap();
    assert_eq!(
        storage.get_by_short(&ctx(), "b2").await.unwrap().created_by,
        "bob"
    );

    // 空批次什么也不做
    storage.add_many(&ctx(), Vec::new(), "bob").await.unwrap();
}

async fn soft_delete_respects_ownership(storage: Arc<dyn Storage>) {
    storage
        .add_many(
            &ctx(),
            vec![
                UrlEntry::new("a1", "https://one"),
                UrlEntry::new("a2", "https://two"),
            ],
            "alice",
        )
        .await
        .unwrap();

    storage
        .mark_deleted(
            &ctx(),
            &[
                DeletionRequest::new("a1", "alice"),
                DeletionRequest::new("a2", "mallory"),
                DeletionRequest::new("nope", "alice"),
            ],
        )
        .await
        .unwrap();

    assert!(storage.get_by_short(&ctx(), "a1").await.unwrap().deleted);
    assert!(!storage.get_by_short(&ctx(), "a2").await.unwrap().deleted);

    let mine = storage.get_urls_created_by(&ctx(), "alice").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].short_url, "a2");

    assert!(matches!(
        storage.get_by_original(&ctx(), "https://one").await,
        Err(ShortenerError::NotFound(_))
    ));

    storage.mark_deleted(&ctx(), &[]).await.unwrap();
}

async fn deleted_url_can_be_added_again(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("old", "https://again"), "alice")
        .await
        .unwrap();
    storage
        .mark_deleted(&ctx(), &[DeletionRequest::new("old", "alice")])
        .await
        .unwrap();

    storage
        .add(&ctx(), UrlEntry::new("new", "https://again"), "bob")
        .await
        .unwrap();

    let active = storage.get_by_original(&ctx(), "https://again").await.unwrap();
    assert_eq!(active.short_url, "new");
    assert!(storage.get_by_short(&ctx(), "old").await.unwrap().deleted);
}

async fn listing_is_per_user(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("a", "https://a"), "alice")
        .await
        .unwrap();
    storage
        .add(&ctx(), UrlEntry::new("b", "https://b"), "bob")
        .await
        .unwrap();
    storage
        .add(&ctx(), UrlEntry::new("c", "https://c"), "alice")
        .await
        .unwrap();

    let mut codes: Vec<String> = storage
        .get_urls_created_by(&ctx(), "alice")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.short_url)
        .collect();
    codes.sort();
    assert_eq!(codes, ["a", "c"]);

    assert!(
        storage
            .get_urls_created_by(&ctx(), "carol")
            .await
            .unwrap()
            .is_empty()
    );
}

async fn canceled_context_is_honoured(storage: Arc<dyn Storage>) {
    let ctx = Context::background();
    ctx.cancel();

    let err = storage
        .add(&ctx, UrlEntry::new("abc", "https://x"), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::Canceled(_)), "{err:?}");
    assert!(matches!(
        storage.get_by_short(&Context::background(), "abc").await,
        Err(ShortenerError::NotFound(_))
    ));
    assert!(matches!(
        storage.ping(&ctx).await,
        Err(ShortenerError::Canceled(_))
    ));
    storage.ping(&Context::background()).await.unwrap();
}

/// 缩短、重复、列出、删除、再查询的完整流程
async fn end_to_end(storage: Arc<dyn Storage>) {
    storage
        .add(&ctx(), UrlEntry::new("e1", "https://e2e/1"), "u1")
        .await
        .unwrap();
    storage
        .add_many(
            &ctx(),
            vec![
                UrlEntry::new("e2", "https://e2e/2"),
                UrlEntry::new("e3", "https://e2e/3"),
            ],
            "u1",
        )
        .await
        .unwrap();

    let dup = storage
        .add(&ctx(), UrlEntry::new("e4", "https://e2e/1"), "u2")
        .await;
    assert!(matches!(dup, Err(ShortenerError::NotUnique(_))));
    assert_eq!(
        storage
            .get_by_original(&ctx(), "https://e2e/1")
            .await
            .unwrap()
            .short_url,
        "e1"
    );

    assert_eq!(
        storage.get_urls_created_by(&ctx(), "u1").await.unwrap().len(),
        3
    );

    storage
        .mark_deleted(
            &ctx(),
            &[
                DeletionRequest::new("e1", "u1"),
                DeletionRequest::new("e2", "u2"),
            ],
        )
        .await
        .unwrap();

    let remaining: Vec<String> = storage
        .get_urls_created_by(&ctx(), "u1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.short_url)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&"e1".to_string()));
    assert!(storage.get_by_short(&ctx(), "e1").await.unwrap().deleted);
}

// =============================================================================
// Per-backend runs
// =============================================================================

macro_rules! contract_tests {
    ($module:ident, $backend:expr) => {
        mod $module {
            use super::*;

            #[tokio::test]
            async fn add_then_lookup() {
                let b = $backend;
                super::add_then_lookup(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn duplicates_are_rejected() {
                let b = $backend;
                super::duplicates_are_rejected(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn batch_is_all_or_nothing() {
                let b = $backend;
                super::batch_is_all_or_nothing(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn soft_delete_respects_ownership() {
                let b = $backend;
                super::soft_delete_respects_ownership(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn deleted_url_can_be_added_again() {
                let b = $backend;
                super::deleted_url_can_be_added_again(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn listing_is_per_user() {
                let b = $backend;
                super::listing_is_per_user(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn canceled_context_is_honoured() {
                let b = $backend;
                super::canceled_context_is_honoured(b.storage.clone()).await;
            }

            #[tokio::test]
            async fn end_to_end() {
                let b = $backend;
                super::end_to_end(b.storage.clone()).await;
            }
        }
    };
}

contract_tests!(memory, memory_backend());
contract_tests!(file, file_backend().await);
contract_tests!(sqlite, sqlite_backend().await);

// =============================================================================
// Backend-specific
// =============================================================================

#[tokio::test]
async fn file_storage_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("urls.jsonl");

    {
        let storage = FileStorage::open(&path).await.unwrap();
        storage
            .add(&ctx(), UrlEntry::new("k", "https://keep"), "alice")
            .await
            .unwrap();
        storage
            .mark_deleted(&ctx(), &[DeletionRequest::new("k", "alice")])
            .await
            .unwrap();
    }

    let reopened = FileStorage::open(&path).await.unwrap();
    let entry = reopened.get_by_short(&ctx(), "k").await.unwrap();
    assert!(entry.deleted);
    assert_eq!(entry.created_by, "alice");
}

#[tokio::test]
async fn sqlite_storage_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("urls.db").display());

    {
        let storage = DatabaseStorage::connect(&dsn, &StorageConfig::default())
            .await
            .unwrap();
        storage
            .add(&ctx(), UrlEntry::new("k", "https://keep"), "alice")
            .await
            .unwrap();
    }

    // 迁移可以重复执行
    let storage = DatabaseStorage::connect(&dsn, &StorageConfig::default())
        .await
        .unwrap();
    assert_eq!(storage.backend_name(), "database");
    assert_eq!(storage.dialect(), "sqlite");
    assert_eq!(
        storage.get_by_short(&ctx(), "k").await.unwrap().original_url,
        "https://keep"
    );
}

#[tokio::test]
async fn concurrent_duplicate_adds_admit_one_winner() {
    let b = file_backend().await;
    let mut handles = Vec::new();
    for i in 0..8 {
        let storage = b.storage.clone();
        handles.push(tokio::spawn(async move {
            storage
                .add(
                    &Context::background(),
                    UrlEntry::new(format!("c{i}"), "https://race"),
                    "alice",
                )
                .await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(ShortenerError::NotUnique(_)) => {}
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert_eq!(ok, 1);
}
