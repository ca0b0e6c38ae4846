//! Shortener - URL shortener service
//!
//! 每个短链接归属于创建它的用户；用户身份由无状态的签名 cookie 承载，
//! 删除请求经后台管线批量软删除。
//!
//! # Architecture
//! - `utils`: base62 编解码与短码生成
//! - `storage`: 存储契约与内存 / 文件 / 数据库三种后端
//! - `deletion`: 批量软删除管线
//! - `auth`: 用户令牌与匿名用户签发
//! - `services`: 业务操作（缩短、解析、列出、删除、探活）
//! - `api`: HTTP 路由与中间件
//! - `config`: 静态配置
//! - `runtime`: 启动、HTTP 服务与关闭
//! - `system`: 日志初始化

pub mod api;
pub mod auth;
pub mod config;
pub mod deletion;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
