//! 短链接业务逻辑
//!
//! HTTP 处理器只负责解析请求和映射状态码，这里负责：
//! - 生成短码并处理重复 URL
//! - 解析短码并区分不存在 / 已删除
//! - 列出用户的链接、提交删除请求、探活

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::User;
use crate::deletion::DeletionManager;
use crate::errors::{Result, ShortenerError};
use crate::storage::{Context, Storage, UrlEntry};
use crate::utils::{RandomSource, ThreadRandom, base62, generate_code, resolve_url};

/// 短码碰撞时的最大重试次数
const MAX_CODE_ATTEMPTS: usize = 3;

// ============ DTOs ============

/// 批量缩短的输入项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedOrigUrl {
    pub correlation_id: String,
    pub original_url: String,
}

/// 批量缩短的输出项，与输入同序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedShortUrl {
    pub correlation_id: String,
    pub short_url: String,
}

/// 用户已保存的链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedUrl {
    pub short_url: String,
    pub original_url: String,
}

/// 缩短结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// 新建的短链接
    Created(String),
    /// URL 已存在（未删除），返回已有的短链接
    Existing(String),
}

impl Shortened {
    pub fn short_url(&self) -> &str {
        match self {
            Shortened::Created(url) | Shortened::Existing(url) => url,
        }
    }

    pub fn into_short_url(self) -> String {
        match self {
            Shortened::Created(url) | Shortened::Existing(url) => url,
        }
    }
}

// ============ Service ============

#[derive(Clone)]
pub struct ShortUrlService {
    base_url: String,
    storage: Arc<dyn Storage>,
    deletion: DeletionManager,
    random: Arc<dyn RandomSource>,
}

impl ShortUrlService {
    pub fn new(
        base_url: impl Into<String>,
        storage: Arc<dyn Storage>,
        deletion: DeletionManager,
    ) -> Self {
        Self::with_random(base_url, storage, deletion, Arc::new(ThreadRandom))
    }

    pub fn with_random(
        base_url: impl Into<String>,
        storage: Arc<dyn Storage>,
        deletion: DeletionManager,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            storage,
            deletion,
            random,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// 生成非空短码（0 会编码成空串）
    fn next_code(&self) -> String {
        loop {
            let code = generate_code(self.random.as_ref());
            if !code.is_empty() {
                return code;
            }
        }
    }

    /// 缩短一个 URL
    ///
    /// URL 已存在时返回 `Existing`；短码碰撞时换一个短码重试。
    pub async fn shorten(&self, ctx: &Context, user: &User, url: &str) -> Result<Shortened> {
        let mut last_err = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.next_code();
            match self
                .storage
                .add(ctx, UrlEntry::new(code.as_str(), url), &user.user_id)
                .await
            {
                Ok(()) => {
                    debug!("Shortened {} -> {}", url, code);
                    return Ok(Shortened::Created(resolve_url(&self.base_url, &code)));
                }
                Err(ShortenerError::NotUnique(msg)) => {
                    match self.storage.get_by_original(ctx, url).await {
                        Ok(existing) => {
                            return Ok(Shortened::Existing(resolve_url(
                                &self.base_url,
                                &existing.short_url,
                            )));
                        }
                        // 冲突来自短码而不是 URL
                        Err(ShortenerError::NotFound(_)) => {
                            warn!("Short code collision on {}, retrying", code);
                            last_err = Some(ShortenerError::not_unique(msg));
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ShortenerError::not_unique("short code collision")))
    }

    /// 批量缩短，结果与输入同序；整批要么全部保存，要么返回错误
    pub async fn shorten_many(
        &self,
        ctx: &Context,
        user: &User,
        items: Vec<CorrelatedOrigUrl>,
    ) -> Result<Vec<CorrelatedShortUrl>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut used = HashSet::with_capacity(items.len());
        let mut entries = Vec::with_capacity(items.len());
        let mut shorts = Vec::with_capacity(items.len());

        for item in items {
            let code = loop {
                let code = self.next_code();
                if used.insert(code.clone()) {
                    break code;
                }
            };
            shorts.push(CorrelatedShortUrl {
                correlation_id: item.correlation_id,
                short_url: resolve_url(&self.base_url, &code),
            });
            entries.push(UrlEntry::new(code, item.original_url));
        }

        self.storage
            .add_many(ctx, entries, &user.user_id)
            .await?;
        Ok(shorts)
    }

    /// 解析短码
    ///
    /// 短码含非法字符返回 `InvalidCharacter`，不存在返回 `NotFound`，
    /// 已软删除返回 `Deleted`。
    pub async fn expand(&self, ctx: &Context, code: &str) -> Result<String> {
        if code.is_empty() {
            return Err(ShortenerError::invalid_character("empty short code"));
        }
        base62::decode(code)?;

        let entry = self.storage.get_by_short(ctx, code).await?;
        if entry.deleted {
            return Err(ShortenerError::deleted(format!("short code {} was deleted", code)));
        }
        Ok(entry.original_url)
    }

    /// 用户创建的所有未删除链接
    pub async fn user_urls(&self, ctx: &Context, user: &User) -> Result<Vec<SavedUrl>> {
        let entries = self
            .storage
            .get_urls_created_by(ctx, &user.user_id)
            .await?;
        Ok(entries
            .into_iter()
            .map(|e| SavedUrl {
                short_url: resolve_url(&self.base_url, &e.short_url),
                original_url: e.original_url,
            })
            .collect())
    }

    /// 提交删除请求，立即返回
    pub async fn delete(&self, user: &User, codes: Vec<String>) -> Result<()> {
        self.deletion.request_delete(&user.user_id, codes).await
    }

    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        self.storage.ping(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deletion::DeletionSettings;
    use crate::storage::MemoryStorage;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 按顺序返回预设值的随机源
    struct Scripted(Mutex<Vec<u64>>);

    impl Scripted {
        fn new(mut values: Vec<u64>) -> Arc<Self> {
            values.reverse();
            Arc::new(Self(Mutex::new(values)))
        }
    }

    impl RandomSource for Scripted {
        fn next_u64(&self) -> u64 {
            self.0.lock().unwrap().pop().unwrap_or(999)
        }
    }

    fn service(random: Arc<dyn RandomSource>) -> (ShortUrlService, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let (deletion, _) = DeletionManager::spawn(
            storage.clone(),
            DeletionSettings {
                capacity: 1,
                flush_interval: Duration::from_secs(60),
            },
        );
        (
            ShortUrlService::with_random("localhost:8080", storage.clone(), deletion, random),
            storage,
        )
    }

    #[tokio::test]
    async fn test_shorten_creates_and_deduplicates() {
        let (svc, _) = service(Scripted::new(vec![1, 2]));
        let ctx = Context::background();
        let user = User::new("u1");

        let first = svc.shorten(&ctx, &user, "http://x").await.unwrap();
        assert_eq!(first, Shortened::Created("http://localhost:8080/1".into()));

        let again = svc.shorten(&ctx, &user, "http://x").await.unwrap();
        assert_eq!(again, Shortened::Existing("http://localhost:8080/1".into()));
    }

    #[tokio::test]
    async fn test_shorten_retries_on_code_collision() {
        let (svc, _) = service(Scripted::new(vec![5, 5, 6]));
        let ctx = Context::background();
        let user = User::new("u1");

        svc.shorten(&ctx, &user, "http://a").await.unwrap();
        let second = svc.shorten(&ctx, &user, "http://b").await.unwrap();
        assert_eq!(second, Shortened::Created("http://localhost:8080/6".into()));
    }

    #[tokio::test]
    async fn test_shorten_skips_zero_draw() {
        let (svc, _) = service(Scripted::new(vec![0, 62]));
        let url = svc
            .shorten(&Context::background(), &User::new("u1"), "http://x")
            .await
            .unwrap();
        assert_eq!(url.short_url(), "http://localhost:8080/01");
    }

    #[tokio::test]
    async fn test_shorten_many_preserves_order() {
        let (svc, _) = service(Scripted::new(vec![10, 11, 12]));
        let items = vec![
            CorrelatedOrigUrl {
                correlation_id: "a".into(),
                original_url: "http://a".into(),
            },
            CorrelatedOrigUrl {
                correlation_id: "b".into(),
                original_url: "http://b".into(),
            },
        ];

        let out = svc
            .shorten_many(&Context::background(), &User::new("u1"), items)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].correlation_id, "a");
        assert_eq!(out[0].short_url, "http://localhost:8080/a");
        assert_eq!(out[1].correlation_id, "b");
        assert_eq!(out[1].short_url, "http://localhost:8080/b");
    }

    #[tokio::test]
    async fn test_expand_distinguishes_outcomes() {
        let (svc, storage) = service(Scripted::new(vec![]));
        let ctx = Context::background();
        storage
            .add(&ctx, UrlEntry::new("live", "http://live"), "u1")
            .await
            .unwrap();
        storage
            .add(&ctx, UrlEntry::new("gone", "http://gone"), "u1")
            .await
            .unwrap();
        storage
            .mark_deleted(&ctx, &[crate::storage::DeletionRequest::new("gone", "u1")])
            .await
            .unwrap();

        assert_eq!(svc.expand(&ctx, "live").await.unwrap(), "http://live");
        assert!(matches!(
            svc.expand(&ctx, "gone").await,
            Err(ShortenerError::Deleted(_))
        ));
        assert!(matches!(
            svc.expand(&ctx, "missing").await,
            Err(ShortenerError::NotFound(_))
        ));
        assert!(matches!(
            svc.expand(&ctx, "bad-code").await,
            Err(ShortenerError::InvalidCharacter(_))
        ));
    }

    #[tokio::test]
    async fn test_user_urls_are_resolved() {
        let (svc, _) = service(Scripted::new(vec![100]));
        let ctx = Context::background();
        let user = User::new("u1");
        svc.shorten(&ctx, &user, "http://x").await.unwrap();

        let urls = svc.user_urls(&ctx, &user).await.unwrap();
        assert_eq!(
            urls,
            vec![SavedUrl {
                short_url: "http://localhost:8080/C1".into(),
                original_url: "http://x".into(),
            }]
        );
        assert!(svc.user_urls(&ctx, &User::new("u2")).await.unwrap().is_empty());
    }
}
