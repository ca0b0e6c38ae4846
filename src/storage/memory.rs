//! 内存后端
//!
//! 进程退出即丢失，适合开发和测试。读共享、写独占。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{Context, DeletionRequest, Storage, UrlEntry};
use crate::errors::{Result, ShortenerError};

#[derive(Default)]
struct Inner {
    by_short: HashMap<String, UrlEntry>,
    /// original_url -> short_url，仅包含未删除记录
    active_by_original: HashMap<String, String>,
}

impl Inner {
    fn check_insertable(&self, entry: &UrlEntry) -> Result<()> {
        if self.active_by_original.contains_key(&entry.original_url) {
            return Err(ShortenerError::not_unique(format!(
                "memory: url already shortened: {}",
                entry.original_url
            )));
        }
        if self.by_short.contains_key(&entry.short_url) {
            return Err(ShortenerError::not_unique(format!(
                "memory: short code already taken: {}",
                entry.short_url
            )));
        }
        Ok(())
    }

    fn insert(&mut self, entry: UrlEntry) {
        self.active_by_original
            .insert(entry.original_url.clone(), entry.short_url.clone());
        self.by_short.insert(entry.short_url.clone(), entry);
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn add(&self, ctx: &Context, entry: UrlEntry, user_id: &str) -> Result<()> {
        ctx.check()?;
        let entry = entry.owned_by(user_id);

        let mut inner = self.inner.write();
        inner.check_insertable(&entry)?;
        inner.insert(entry);
        Ok(())
    }

    async fn add_many(&self, ctx: &Context, entries: Vec<UrlEntry>, user_id: &str) -> Result<()> {
        ctx.check()?;
        if entries.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();

        // 整批校验，包括批内重复
        {
            let mut seen_original = HashSet::with_capacity(entries.len());
            let mut seen_short = HashSet::with_capacity(entries.len());
            for entry in &entries {
                inner.check_insertable(entry)?;
                if !seen_original.insert(entry.original_url.as_str())
                    || !seen_short.insert(entry.short_url.as_str())
                {
                    return Err(ShortenerError::not_unique(format!(
                        "memory: duplicate entry in batch: {}",
                        entry.original_url
                    )));
                }
            }
        }

        let count = entries.len();
        for entry in entries {
            inner.insert(entry.owned_by(user_id));
        }
        debug!("memory: inserted {} entries", count);
        Ok(())
    }

    async fn get_by_short(&self, ctx: &Context, short_url: &str) -> Result<UrlEntry> {
        ctx.check()?;
        self.inner
            .read()
            .by_short
            .get(short_url)
            .cloned()
            .ok_or_else(|| ShortenerError::not_found(format!("memory: no entry for {}", short_url)))
    }

    async fn get_by_original(&self, ctx: &Context, original_url: &str) -> Result<UrlEntry> {
        ctx.check()?;
        let inner = self.inner.read();
        inner
            .active_by_original
            .get(original_url)
            .and_then(|code| inner.by_short.get(code))
            .cloned()
            .ok_or_else(|| {
                ShortenerError::not_found(format!("memory: no entry for {}", original_url))
            })
    }

    async fn get_urls_created_by(&self, ctx: &Context, user_id: &str) -> Result<Vec<UrlEntry>> {
        ctx.check()?;
        let inner = self.inner.read();
        let mut urls: Vec<UrlEntry> = inner
            .by_short
            .values()
            .filter(|e| !e.deleted && e.created_by == user_id)
            .cloned()
            .collect();
        // HashMap 无序，按短码排序保证输出稳定
        urls.sort_by(|a, b| a.short_url.cmp(&b.short_url));
        Ok(urls)
    }

    async fn mark_deleted(&self, ctx: &Context, requests: &[DeletionRequest]) -> Result<()> {
        ctx.check()?;
        if requests.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();
        let mut applied = 0usize;
        for req in requests {
            let Some(entry) = inner.by_short.get_mut(&req.short_url) else {
                continue;
            };
            if entry.deleted || !req.applies_to(entry) {
                continue;
            }
            entry.deleted = true;
            let original = entry.original_url.clone();
            // 只移除指向本条记录的索引
            if inner.active_by_original.get(&original) == Some(&req.short_url) {
                inner.active_by_original.remove(&original);
            }
            applied += 1;
        }
        debug!(
            "memory: soft-deleted {}/{} requested entries",
            applied,
            requests.len()
        );
        Ok(())
    }

    async fn ping(&self, ctx: &Context) -> Result<()> {
        ctx.check()
    }
}
