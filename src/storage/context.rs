//! 存储调用的取消 / 超时信号
//!
//! 每个存储操作都接收一个 [`Context`]。无法真正中断的操作（比如文件全量扫描）
//! 在每次迭代时调用 [`Context::check`]；异步调用通过 [`Context::run`] 与信号竞争。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, ShortenerError};

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// 永不取消的上下文（删除管道刷盘使用）
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ShortenerError::canceled("context canceled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ShortenerError::canceled("context deadline exceeded"));
        }
        Ok(())
    }

    /// 执行一个异步操作，信号先到则放弃等待并返回 `Canceled`
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        match self.deadline {
            Some(deadline) => tokio::select! {
                res = fut => res,
                _ = self.token.cancelled() => Err(ShortenerError::canceled("context canceled")),
                _ = tokio::time::sleep_until(deadline) => {
                    Err(ShortenerError::canceled("context deadline exceeded"))
                }
            },
            None => tokio::select! {
                res = fut => res,
                _ = self.token.cancelled() => Err(ShortenerError::canceled("context canceled")),
            },
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
