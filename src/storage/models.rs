use serde::{Deserialize, Serialize};

/// 一条短链接记录
///
/// `short_url` 一经分配不再改变；`deleted` 只会从 false 变为 true。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub short_url: String,
    pub original_url: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub deleted: bool,
}

impl UrlEntry {
    pub fn new(short_url: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            short_url: short_url.into(),
            original_url: original_url.into(),
            created_by: String::new(),
            deleted: false,
        }
    }

    /// 插入前的规范化：归属于调用者，且总是未删除
    pub(crate) fn owned_by(mut self, user_id: &str) -> Self {
        self.created_by = user_id.to_string();
        self.deleted = false;
        self
    }
}

/// 删除请求：只有 `created_by == user_id` 时才会生效
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionRequest {
    pub short_url: String,
    pub user_id: String,
}

impl DeletionRequest {
    pub fn new(short_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            short_url: short_url.into(),
            user_id: user_id.into(),
        }
    }

    /// 当前记录是否允许被此请求删除
    pub fn applies_to(&self, entry: &UrlEntry) -> bool {
        entry.short_url == self.short_url && entry.created_by == self.user_id
    }
}
