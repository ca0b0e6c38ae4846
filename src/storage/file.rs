//! 追加日志文件后端
//!
//! 每行一条 JSON 记录。插入只追加；同一短码以最后一条记录为准。
//! 软删除需要整体重写：写入同目录临时文件、fsync、再 rename 覆盖。
//! 所有操作（包括读）都持有同一把互斥锁，读者不会看到重写到一半的文件。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{Context, DeletionRequest, Storage, UrlEntry};
use crate::errors::{Result, ShortenerError};

/// 日志末尾的状态，追加前据此修复
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tail {
    /// 最后一条完整记录结束处的字节偏移
    clean_len: u64,
    /// `clean_len` 之后残留着写了一半的记录
    torn: bool,
    /// 最后一条完整记录后面没有换行
    unterminated: bool,
}

/// 一次全量扫描的结果
#[derive(Default)]
struct Snapshot {
    /// 按短码首次出现的顺序
    entries: Vec<UrlEntry>,
    index: HashMap<String, usize>,
    tail: Tail,
}

impl Snapshot {
    fn upsert(&mut self, entry: UrlEntry) {
        match self.index.get(&entry.short_url) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.short_url.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn by_short(&self, short_url: &str) -> Option<&UrlEntry> {
        self.index.get(short_url).map(|&pos| &self.entries[pos])
    }

    fn active_by_original(&self, original_url: &str) -> Option<&UrlEntry> {
        self.entries
            .iter()
            .find(|e| !e.deleted && e.original_url == original_url)
    }

    fn check_insertable(&self, entry: &UrlEntry) -> Result<()> {
        if self.active_by_original(&entry.original_url).is_some() {
            return Err(ShortenerError::not_unique(format!(
                "file: url already shortened: {}",
                entry.original_url
            )));
        }
        if self.by_short(&entry.short_url).is_some() {
            return Err(ShortenerError::not_unique(format!(
                "file: short code already taken: {}",
                entry.short_url
            )));
        }
        Ok(())
    }
}

pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// 打开（不存在则创建）日志文件
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                ShortenerError::file_operation(format!(
                    "file: cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                ShortenerError::file_operation(format!(
                    "file: cannot open {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!("File storage opened at {}", path.display());
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn acquire(&self, ctx: &Context) -> Result<MutexGuard<'_, ()>> {
        ctx.run(async { Ok(self.lock.lock().await) }).await
    }

    /// 顺序扫描整个日志，每条记录前检查取消信号
    ///
    /// 最后一行损坏（进程在追加中途退出）只告警，位置记在 [`Tail`] 里，
    /// 下一次追加会先把它截掉；中间行损坏视为数据错误。
    async fn scan(&self, ctx: &Context) -> Result<Snapshot> {
        let file = File::open(&self.path).await?;
        let mut reader = BufReader::new(file);
        let mut snapshot = Snapshot::default();
        let mut broken: Option<(usize, serde_json::Error)> = None;
        let mut line = Vec::new();
        let mut line_no = 0usize;
        let mut offset = 0u64;

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).await?;
            if read == 0 {
                break;
            }
            ctx.check()?;
            line_no += 1;
            offset += read as u64;
            let terminated = line.last() == Some(&b'\n');

            let record = line.trim_ascii();
            if record.is_empty() {
                if broken.is_none() {
                    snapshot.tail.clean_len = offset;
                    snapshot.tail.unterminated = false;
                }
                continue;
            }
            if let Some((bad_line, err)) = broken.take() {
                return Err(ShortenerError::serialization(format!(
                    "file: corrupt record at line {}: {}",
                    bad_line, err
                )));
            }
            match serde_json::from_slice::<UrlEntry>(record) {
                Ok(entry) => {
                    snapshot.upsert(entry);
                    snapshot.tail.clean_len = offset;
                    snapshot.tail.unterminated = !terminated;
                }
                Err(e) => broken = Some((line_no, e)),
            }
        }

        if let Some((bad_line, err)) = broken {
            warn!(
                "file: ignoring truncated trailing record at line {} of {}: {}",
                bad_line,
                self.path.display(),
                err
            );
            snapshot.tail.torn = true;
        }
        Ok(snapshot)
    }

    /// 追加记录；日志末尾有半条记录时先截断到最后一条完整记录
    async fn append(&self, tail: Tail, entries: &[UrlEntry]) -> Result<()> {
        let mut buf = Vec::new();
        if tail.unterminated {
            buf.push(b'\n');
        }
        for entry in entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        if tail.torn {
            warn!(
                "file: truncating {} to {} bytes before append",
                self.path.display(),
                tail.clean_len
            );
            file.set_len(tail.clean_len).await?;
        }
        file.write_all(&buf).await?;
        file.sync_data().await?;
        Ok(())
    }

    /// 原子重写：临时文件 + fsync + rename
    async fn rewrite(&self, entries: &[UrlEntry]) -> Result<()> {
        let mut buf = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let tmp_path = self.tmp_path();
        let mut tmp = File::create(&tmp_path).await?;
        tmp.write_all(&buf).await?;
        tmp.sync_all().await?;
        drop(tmp);

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn add(&self, ctx: &Context, entry: UrlEntry, user_id: &str) -> Result<()> {
        let _guard = self.acquire(ctx).await?;
        let entry = entry.owned_by(user_id);

        let snapshot = self.scan(ctx).await?;
        snapshot.check_insertable(&entry)?;

        ctx.check()?;
        self.append(snapshot.tail, std::slice::from_ref(&entry)).await
    }

    async fn add_many(&self, ctx: &Context, entries: Vec<UrlEntry>, user_id: &str) -> Result<()> {
        if entries.is_empty() {
            return ctx.check();
        }
        let _guard = self.acquire(ctx).await?;

        // 先在快照上整体校验，批内重复同样会被发现
        let mut snapshot = self.scan(ctx).await?;
        let mut batch = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.owned_by(user_id);
            snapshot.check_insertable(&entry)?;
            snapshot.upsert(entry.clone());
            batch.push(entry);
        }

        ctx.check()?;
        self.append(snapshot.tail, &batch).await?;
        debug!("file: appended {} entries", batch.len());
        Ok(())
    }

    async fn get_by_short(&self, ctx: &Context, short_url: &str) -> Result<UrlEntry> {
        let _guard = self.acquire(ctx).await?;
        let snapshot = self.scan(ctx).await?;
        snapshot
            .by_short(short_url)
            .cloned()
            .ok_or_else(|| ShortenerError::not_found(format!("file: no entry for {}", short_url)))
    }

    async fn get_by_original(&self, ctx: &Context, original_url: &str) -> Result<UrlEntry> {
        let _guard = self.acquire(ctx).await?;
        let snapshot = self.scan(ctx).await?;
        snapshot
            .active_by_original(original_url)
            .cloned()
            .ok_or_else(|| {
                ShortenerError::not_found(format!("file: no entry for {}", original_url))
            })
    }

    async fn get_urls_created_by(&self, ctx: &Context, user_id: &str) -> Result<Vec<UrlEntry>> {
        let _guard = self.acquire(ctx).await?;
        let snapshot = self.scan(ctx).await?;
        Ok(snapshot
            .entries
            .into_iter()
            .filter(|e| !e.deleted && e.created_by == user_id)
            .collect())
    }

    async fn mark_deleted(&self, ctx: &Context, requests: &[DeletionRequest]) -> Result<()> {
        if requests.is_empty() {
            return ctx.check();
        }
        let _guard = self.acquire(ctx).await?;
        let mut snapshot = self.scan(ctx).await?;

        let mut applied = 0usize;
        for req in requests {
            let Some(&pos) = snapshot.index.get(&req.short_url) else {
                continue;
            };
            let entry = &mut snapshot.entries[pos];
            if !entry.deleted && req.applies_to(entry) {
                entry.deleted = true;
                applied += 1;
            }
        }

        if applied == 0 {
            return Ok(());
        }

        // 重写开始后不再响应取消，避免留下半成品
        ctx.check()?;
        self.rewrite(&snapshot.entries).await?;
        debug!(
            "file: soft-deleted {}/{} requested entries",
            applied,
            requests.len()
        );
        Ok(())
    }

    async fn ping(&self, ctx: &Context) -> Result<()> {
        ctx.run(async {
            let meta = fs::metadata(&self.path).await?;
            if !meta.is_file() {
                return Err(ShortenerError::file_operation(format!(
                    "file: {} is not a regular file",
                    self.path.display()
                )));
            }
            Ok(())
        })
        .await
    }
}
