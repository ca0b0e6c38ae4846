use crate::storage::UrlEntry;
use migration::entities::url;

/// 将 Sea-ORM Model 转换为 UrlEntry
pub fn model_to_entry(model: url::Model) -> UrlEntry {
    UrlEntry {
        short_url: model.short_url,
        original_url: model.original_url,
        created_by: model.created_by,
        deleted: model.deleted,
    }
}

/// 将 UrlEntry 转换为插入用的 ActiveModel
pub fn entry_to_active_model(entry: &UrlEntry) -> url::ActiveModel {
    use sea_orm::ActiveValue::Set;

    url::ActiveModel {
        short_url: Set(entry.short_url.clone()),
        original_url: Set(entry.original_url.clone()),
        created_by: Set(entry.created_by.clone()),
        deleted: Set(entry.deleted),
    }
}
