use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace};

use crate::config::DeletionConfig;
use crate::errors::{Result, ShortenerError};
use crate::storage::{Context, DeletionRequest, Storage};

/// 管道参数
#[derive(Debug, Clone, Copy)]
pub struct DeletionSettings {
    /// 缓冲区容量 C，同时作为通道容量
    pub capacity: usize,
    /// 定时刷盘周期 T
    pub flush_interval: Duration,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            capacity: 1024,
            flush_interval: Duration::from_secs(10),
        }
    }
}

impl From<&DeletionConfig> for DeletionSettings {
    fn from(config: &DeletionConfig) -> Self {
        Self {
            capacity: config.buffer_capacity,
            flush_interval: config.flush_interval(),
        }
    }
}

/// 删除请求的生产者句柄
///
/// 可以任意克隆；所有句柄都被丢弃后，后台任务刷出剩余请求并退出。
#[derive(Clone)]
pub struct DeletionManager {
    tx: mpsc::Sender<DeletionRequest>,
}

impl DeletionManager {
    /// 启动后台任务，返回生产者句柄和任务句柄
    pub fn spawn(
        storage: Arc<dyn Storage>,
        settings: DeletionSettings,
    ) -> (Self, JoinHandle<()>) {
        let capacity = settings.capacity.max(1);
        // interval 不接受零周期
        let flush_interval = settings.flush_interval.max(Duration::from_millis(1));

        let (tx, rx) = mpsc::channel(capacity);
        let worker = DeletionWorker {
            storage,
            rx,
            buffer: Vec::with_capacity(capacity),
            capacity,
            flush_interval,
        };

        info!(
            "Deletion pipeline started (capacity: {}, flush interval: {:?})",
            capacity, flush_interval
        );
        (Self { tx }, tokio::spawn(worker.run()))
    }

    /// 按顺序把 `codes` 逐个送入管道
    ///
    /// 只有通道满时才会等待；不等待删除真正生效。
    /// 后台任务已退出时返回 `PipelineClosed`。
    pub async fn request_delete(&self, user_id: &str, codes: Vec<String>) -> Result<()> {
        let count = codes.len();
        for code in codes {
            self.tx
                .send(DeletionRequest::new(code, user_id))
                .await
                .map_err(|_| ShortenerError::pipeline_closed("deletion worker is not running"))?;
        }
        trace!("Queued {} deletion requests for {}", count, user_id);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct DeletionWorker {
    storage: Arc<dyn Storage>,
    rx: mpsc::Receiver<DeletionRequest>,
    buffer: Vec<DeletionRequest>,
    capacity: usize,
    flush_interval: Duration,
}

impl DeletionWorker {
    async fn run(mut self) {
        // 第一次 tick 在一个周期之后
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(req) => {
                        self.buffer.push(req);
                        if self.buffer.len() >= self.capacity {
                            self.flush().await;
                        }
                    }
                    None => {
                        self.flush().await;
                        info!("Deletion pipeline stopped");
                        return;
                    }
                },
                _ = ticker.tick() => {
                    if !self.buffer.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }
    }

    /// 刷出整个缓冲区；失败只记录日志，这一批直接丢弃
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
        // 刷盘不能中途放弃，使用永不取消的上下文
        let ctx = Context::background();
        match self.storage.mark_deleted(&ctx, &batch).await {
            Ok(()) => debug!("Deletion pipeline flushed {} requests", batch.len()),
            Err(e) => error!(
                "Deletion pipeline failed to flush {} requests, batch dropped: {}",
                batch.len(),
                e
            ),
        }
    }
}
