//! 写操作

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, TransactionTrait, sea_query::Expr,
};
use tracing::debug;

use super::converters::entry_to_active_model;
use super::{DatabaseStorage, map_db_err};
use crate::errors::Result;
use crate::storage::{DeletionRequest, UrlEntry};

use migration::entities::url;

/// 单条语句里的最大行数，避开各数据库的绑定参数上限
const CHUNK_SIZE: usize = 500;

impl DatabaseStorage {
    pub(super) async fn insert_one(&self, entry: &UrlEntry) -> Result<()> {
        let db = &self.db;
        self.retry.run("add", || async {
            url::Entity::insert(entry_to_active_model(entry))
                .exec(db)
                .await
                .map(|_| ())
        })
        .await
        .map_err(|e| map_db_err("add", e))
    }

    /// 批量插入，整批在一个事务里，任何一行失败都会回滚
    pub(super) async fn insert_batch(&self, entries: &[UrlEntry]) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| map_db_err("add_many: begin", e))?;

        for chunk in entries.chunks(CHUNK_SIZE) {
            let models: Vec<url::ActiveModel> = chunk.iter().map(entry_to_active_model).collect();
            url::Entity::insert_many(models)
                .exec(&txn)
                .await
                .map_err(|e| map_db_err("add_many", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| map_db_err("add_many: commit", e))?;

        debug!("db: inserted {} entries", entries.len());
        Ok(())
    }

    /// 批量软删除，只更新 `created_by` 匹配且尚未删除的行
    pub(super) async fn soft_delete(&self, requests: &[DeletionRequest]) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| map_db_err("mark_deleted: begin", e))?;

        let mut affected = 0u64;
        for chunk in requests.chunks(CHUNK_SIZE) {
            let owned = chunk.iter().fold(Condition::any(), |cond, req| {
                cond.add(
                    Condition::all()
                        .add(url::Column::ShortUrl.eq(req.short_url.as_str()))
                        .add(url::Column::CreatedBy.eq(req.user_id.as_str())),
                )
            });

            let result = url::Entity::update_many()
                .col_expr(url::Column::Deleted, Expr::value(true))
                .filter(url::Column::Deleted.eq(false))
                .filter(owned)
                .exec(&txn)
                .await
                .map_err(|e| map_db_err("mark_deleted", e))?;
            affected += result.rows_affected;
        }

        txn.commit()
            .await
            .map_err(|e| map_db_err("mark_deleted: commit", e))?;

        debug!(
            "db: soft-deleted {}/{} requested entries",
            affected,
            requests.len()
        );
        Ok(())
    }
}
