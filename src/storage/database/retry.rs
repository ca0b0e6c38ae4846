//! 数据库调用的重试策略
//!
//! [`RetryPolicy`] 由存储配置（`retry_count` / `retry_base_delay_ms` /
//! `retry_max_delay_ms`）构造，查询和单条插入都经由 [`RetryPolicy::run`] 执行。
//! 只有瞬时错误会被重试：连接获取失败、连接中断、死锁、锁等待超时、
//! SQLite BUSY/LOCKED。约束冲突等确定性错误第一次就原样返回。

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tracing::{debug, warn};

use crate::config::StorageConfig;

/// 各数据库表示锁冲突的错误码
const TRANSIENT_CODES: &[&str] = &[
    // MySQL: deadlock, lock wait timeout
    "1213", "1205",
    // PostgreSQL: serialization_failure, deadlock_detected
    "40001", "40P01",
    // SQLite: SQLITE_BUSY, SQLITE_LOCKED
    "5", "6",
];

/// 驱动没有给出错误码时按消息匹配
const TRANSIENT_MESSAGES: &[&str] = &[
    "deadlock",
    "lock wait timeout",
    "database is locked",
    "serialization failure",
];

/// 重试次数与退避区间
///
/// 第 n 次重试前等待 `base * 2^(n-1)`，封顶 `cap`，再叠加至多 25% 的随机抖动，
/// 避免并发写入者同时醒来再次冲突。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 首次失败后最多再尝试几次
    pub retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_millis(100),
            cap: Duration::from_secs(2),
        }
    }
}

impl From<&StorageConfig> for RetryPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            retries: config.retry_count,
            base: Duration::from_millis(config.retry_base_delay_ms),
            cap: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试（从 1 开始）前的等待时间
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let capped = self.base.saturating_mul(factor).min(self.cap);
        let spread = capped.as_millis() as u64 / 4;
        capped + Duration::from_millis(rand::rng().random_range(0..=spread))
    }

    /// 执行 `call`，瞬时错误按退避重试，其余错误直接返回
    pub async fn run<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, DbErr>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let mut retry = 0;
        loop {
            let err = match call().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!("db: {} succeeded after {} retries", op, retry);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };
            if retry >= self.retries || !is_transient(&err) {
                return Err(err);
            }

            retry += 1;
            let wait = self.delay(retry);
            warn!(
                "db: {} hit a transient error ({}/{}): {}; retrying in {:?}",
                op, retry, self.retries, err, wait
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// 错误是否值得重试
pub fn is_transient(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => return true,
        DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sqlx_err) => {
            let code = sqlx_err
                .as_database_error()
                .and_then(|db_err| db_err.code());
            match code {
                Some(code) => TRANSIENT_CODES.contains(&code.as_ref()),
                None => mentions_lock_conflict(&sqlx_err.to_string()),
            }
        }
        RuntimeErr::Internal(msg) => mentions_lock_conflict(msg),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn mentions_lock_conflict(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    TRANSIENT_MESSAGES.iter().any(|m| msg.contains(m))
}
