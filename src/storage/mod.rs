//! 存储引擎
//!
//! 三种后端（内存 / 追加日志文件 / 关系数据库）实现同一个 [`Storage`] 契约：
//! - 同一个 `original_url` 最多只有一条未删除记录，重复插入返回 `NotUnique`
//! - `deleted` 只能从 false 变为 true
//! - 软删除只对 `created_by` 匹配的请求生效，不匹配的静默跳过
//! - 所有操作都接收 [`Context`]，取消或超时后返回 `Canceled`

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::Result;

pub mod context;
pub mod database;
pub mod file;
pub mod memory;
pub mod models;

pub use context::Context;
pub use database::DatabaseStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use models::{DeletionRequest, UrlEntry};

#[async_trait]
pub trait Storage: Send + Sync {
    /// 后端名称，仅用于日志
    fn backend_name(&self) -> &'static str;

    /// 插入一条记录，`created_by` 以 `user_id` 为准
    async fn add(&self, ctx: &Context, entry: UrlEntry, user_id: &str) -> Result<()>;

    /// 批量插入
    ///
    /// 内存和数据库后端是全有或全无；文件后端先整体校验再追加，
    /// 追加过程中发生 I/O 错误时可能只写入了前缀部分。
    async fn add_many(&self, ctx: &Context, entries: Vec<UrlEntry>, user_id: &str) -> Result<()>;

    /// 按短码查询（包含已删除记录）
    async fn get_by_short(&self, ctx: &Context, short_url: &str) -> Result<UrlEntry>;

    /// 按原始 URL 查询未删除的记录
    async fn get_by_original(&self, ctx: &Context, original_url: &str) -> Result<UrlEntry>;

    /// 某个用户创建的所有未删除记录
    async fn get_urls_created_by(&self, ctx: &Context, user_id: &str) -> Result<Vec<UrlEntry>>;

    /// 批量软删除
    async fn mark_deleted(&self, ctx: &Context, requests: &[DeletionRequest]) -> Result<()>;

    /// 存活探测
    async fn ping(&self, ctx: &Context) -> Result<()>;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 按配置选择后端：DSN 优先，其次文件路径，否则使用内存
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = if !config.database_dsn.is_empty() {
            Arc::new(DatabaseStorage::connect(&config.database_dsn, config).await?)
        } else if !config.file_storage_path.is_empty() {
            Arc::new(FileStorage::open(&config.file_storage_path).await?)
        } else {
            Arc::new(MemoryStorage::new())
        };

        info!("Storage backend selected: {}", storage.backend_name());
        Ok(storage)
    }
}
