//! original_url 唯一约束
//!
//! 只约束未删除的记录：软删除后同一 URL 可以重新缩短。
//! MySQL 不支持部分索引，只能退化为无条件唯一索引，
//! 因此在 MySQL 上软删除的 URL 无法再次添加。

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        match manager.get_database_backend() {
            DatabaseBackend::Postgres | DatabaseBackend::Sqlite => {
                conn.execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_urls_original_url_active \
                     ON urls (original_url) WHERE deleted = false",
                )
                .await?;
            }
            _ => {
                // TEXT 列在 MySQL 上需要前缀长度
                conn.execute_unprepared(
                    "CREATE UNIQUE INDEX idx_urls_original_url_active ON urls (original_url(512))",
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_urls_original_url_active")
                    .table(Urls::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Urls {
    Table,
}
