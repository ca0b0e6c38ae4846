//! 数据库连接与迁移

use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::SqlitePool;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxSqliteConnector};
use tracing::{debug, info};

use crate::errors::{Result, ShortenerError};
use migration::{Migrator, MigratorTrait};

/// SQLite 写锁等待时间，并发写入时避免立即返回 SQLITE_BUSY
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite：文件不存在时自动创建，WAL 模式
pub async fn connect_sqlite(dsn: &str) -> Result<DatabaseConnection> {
    let options = SqliteConnectOptions::from_str(dsn)
        .map_err(|e| ShortenerError::database_config(format!("db: invalid sqlite dsn: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .pragma("temp_store", "memory");

    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| ShortenerError::database_connection(format!("db: sqlite: {}", e)))?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接池参数
fn pool_options(dsn: &str, pool_size: u32) -> ConnectOptions {
    let pool_size = pool_size.max(1);
    let mut options = ConnectOptions::new(dsn.to_owned());
    options
        .max_connections(pool_size)
        .min_connections(pool_size.min(2))
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);
    options
}

/// MySQL / PostgreSQL
pub async fn connect_generic(
    dsn: &str,
    backend_name: &str,
    pool_size: u32,
) -> Result<DatabaseConnection> {
    Database::connect(pool_options(dsn, pool_size))
        .await
        .map_err(|e| ShortenerError::database_connection(format!("db: {}: {}", backend_name, e)))
}

/// 执行所有未应用的迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| ShortenerError::database_operation(format!("db: migrations: {}", e)))?;
    if pending.is_empty() {
        debug!("Database schema is up to date");
        return Ok(());
    }

    Migrator::up(db, None)
        .await
        .map_err(|e| ShortenerError::database_operation(format!("db: migrations: {}", e)))?;
    info!("Applied {} database migrations", pending.len());
    Ok(())
}
