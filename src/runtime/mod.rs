//! 进程生命周期
//!
//! - `lifetime::startup`：构建存储、删除管线和业务服务
//! - `lifetime::shutdown`：关闭删除管线并等待剩余批次落盘
//! - `server`：HTTP 服务

pub mod lifetime;
pub mod server;

pub use server::run_server;
