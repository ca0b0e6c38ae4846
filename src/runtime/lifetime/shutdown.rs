use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

/// 等待删除管线刷出剩余请求的最长时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 等待删除管线退出
///
/// 调用前必须已经丢弃所有 `DeletionManager` 句柄，否则通道不会关闭。
pub async fn drain_deletion_pipeline(worker: JoinHandle<()>) {
    match timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), worker).await {
        Ok(Ok(())) => info!("Deletion pipeline drained"),
        Ok(Err(e)) => error!("Deletion worker terminated abnormally: {}", e),
        Err(_) => error!(
            "Deletion pipeline did not drain within {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}
