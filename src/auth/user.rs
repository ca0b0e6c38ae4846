use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::{RandomSource, ThreadRandom};

/// 已识别的调用者
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
}

impl User {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// 匿名用户的发号器
#[derive(Clone)]
pub struct UserStore {
    random: Arc<dyn RandomSource>,
}

impl UserStore {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// 生成 `"{unix 秒}-{随机 u64}"` 形式的新用户
    pub fn new_anonymous(&self) -> User {
        let now = chrono::Utc::now().timestamp();
        User::new(format!("{}-{}", now, self.random.next_u64()))
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}
