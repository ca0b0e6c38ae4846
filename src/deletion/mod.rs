//! 删除管道
//!
//! 删除请求先进入有界通道，由单个后台任务攒批后调用 `Storage::mark_deleted`。
//! 调用方在请求入队后立即返回，删除最终才会生效。

mod manager;

pub use manager::{DeletionManager, DeletionSettings};
