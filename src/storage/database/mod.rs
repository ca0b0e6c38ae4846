//! 关系数据库后端
//!
//! 基于 SeaORM，支持 SQLite、MySQL/MariaDB 和 PostgreSQL。
//! 唯一性由数据库约束保证，违反约束的错误统一映射为 `NotUnique`。

mod connection;
mod converters;
mod mutations;
mod query;
mod retry;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::{Result, ShortenerError};
use crate::storage::{Context, DeletionRequest, Storage, UrlEntry};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{entry_to_active_model, model_to_entry};
pub use retry::{RetryPolicy, is_transient};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<&'static str> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite")
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql")
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(ShortenerError::database_config(format!(
            "无法从 DSN 推断数据库类型: {}. 支持的格式: sqlite:, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 把 DbErr 转换为领域错误：唯一约束冲突 -> NotUnique，其余加上 `db:` 前缀
pub(crate) fn map_db_err(op: &str, err: DbErr) -> ShortenerError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return ShortenerError::not_unique(format!("db: {}: {}", op, detail));
    }
    ShortenerError::database_operation(format!("db: {}: {}", op, err))
}

#[derive(Clone)]
pub struct DatabaseStorage {
    db: DatabaseConnection,
    backend_name: &'static str,
    retry: RetryPolicy,
}

impl DatabaseStorage {
    /// 连接数据库并执行迁移
    pub async fn connect(dsn: &str, config: &StorageConfig) -> Result<Self> {
        if dsn.is_empty() {
            return Err(ShortenerError::database_config("database DSN is empty"));
        }

        let backend_name = infer_backend_from_url(dsn)?;
        let retry = RetryPolicy::from(config);

        let db = if backend_name == "sqlite" {
            connect_sqlite(dsn).await?
        } else {
            connect_generic(dsn, backend_name, config.pool_size).await?
        };

        run_migrations(&db).await?;

        info!("{} storage initialized", backend_name.to_uppercase());
        Ok(Self {
            db,
            backend_name,
            retry,
        })
    }

    /// 数据库方言名称（sqlite / mysql / postgres）
    pub fn dialect(&self) -> &'static str {
        self.backend_name
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    async fn add(&self, ctx: &Context, entry: UrlEntry, user_id: &str) -> Result<()> {
        let entry = entry.owned_by(user_id);
        ctx.run(self.insert_one(&entry)).await
    }

    async fn add_many(&self, ctx: &Context, entries: Vec<UrlEntry>, user_id: &str) -> Result<()> {
        if entries.is_empty() {
            return ctx.check();
        }
        let entries: Vec<UrlEntry> = entries.into_iter().map(|e| e.owned_by(user_id)).collect();
        // 取消时事务被丢弃，自动回滚
        ctx.run(self.insert_batch(&entries)).await
    }

    async fn get_by_short(&self, ctx: &Context, short_url: &str) -> Result<UrlEntry> {
        ctx.run(self.find_by_short(short_url)).await
    }

    async fn get_by_original(&self, ctx: &Context, original_url: &str) -> Result<UrlEntry> {
        ctx.run(self.find_active_by_original(original_url)).await
    }

    async fn get_urls_created_by(&self, ctx: &Context, user_id: &str) -> Result<Vec<UrlEntry>> {
        ctx.run(self.find_active_by_creator(user_id)).await
    }

    async fn mark_deleted(&self, ctx: &Context, requests: &[DeletionRequest]) -> Result<()> {
        if requests.is_empty() {
            return ctx.check();
        }
        ctx.run(self.soft_delete(requests)).await
    }

    async fn ping(&self, ctx: &Context) -> Result<()> {
        ctx.run(async { self.db.ping().await.map_err(|e| map_db_err("ping", e)) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://urls.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("sqlite::memory:").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("data/urls.sqlite").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("mysql://u:p@h/db").unwrap(), "mysql");
        assert_eq!(infer_backend_from_url("mariadb://u:p@h/db").unwrap(), "mysql");
        assert_eq!(
            infer_backend_from_url("postgres://u:p@h/db").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://u:p@h/db").unwrap(),
            "postgres"
        );
    }

    #[test]
    fn test_infer_backend_rejects_unknown_scheme() {
        let err = infer_backend_from_url("redis://localhost").unwrap_err();
        assert!(matches!(err, ShortenerError::DatabaseConfig(_)));
    }

    #[test]
    fn test_map_db_err_keeps_prefix() {
        let err = map_db_err("get_by_short", DbErr::Custom("boom".into()));
        assert!(matches!(err, ShortenerError::DatabaseOperation(_)));
        assert!(err.message().starts_with("db: get_by_short"));
    }
}
