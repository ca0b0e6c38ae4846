//! 只读查询

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::converters::model_to_entry;
use super::{DatabaseStorage, map_db_err};
use crate::errors::{Result, ShortenerError};
use crate::storage::UrlEntry;

use migration::entities::url;

impl DatabaseStorage {
    pub(super) async fn find_by_short(&self, short_url: &str) -> Result<UrlEntry> {
        let db = &self.db;
        let model = self.retry.run("get_by_short", || async {
            url::Entity::find_by_id(short_url).one(db).await
        })
        .await
        .map_err(|e| map_db_err("get_by_short", e))?;

        model
            .map(model_to_entry)
            .ok_or_else(|| ShortenerError::not_found(format!("db: no entry for {}", short_url)))
    }

    pub(super) async fn find_active_by_original(&self, original_url: &str) -> Result<UrlEntry> {
        let db = &self.db;
        let model = self.retry.run("get_by_original", || async {
            url::Entity::find()
                .filter(url::Column::OriginalUrl.eq(original_url))
                .filter(url::Column::Deleted.eq(false))
                .one(db)
                .await
        })
        .await
        .map_err(|e| map_db_err("get_by_original", e))?;

        model.map(model_to_entry).ok_or_else(|| {
            ShortenerError::not_found(format!("db: no entry for {}", original_url))
        })
    }

    pub(super) async fn find_active_by_creator(&self, user_id: &str) -> Result<Vec<UrlEntry>> {
        let db = &self.db;
        let models = self.retry.run("get_urls_created_by", || async {
            url::Entity::find()
                .filter(url::Column::CreatedBy.eq(user_id))
                .filter(url::Column::Deleted.eq(false))
                .order_by_asc(url::Column::ShortUrl)
                .all(db)
                .await
        })
        .await
        .map_err(|e| map_db_err("get_urls_created_by", e))?;

        Ok(models.into_iter().map(model_to_entry).collect())
    }
}
