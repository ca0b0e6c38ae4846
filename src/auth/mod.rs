//! 用户身份
//!
//! 无服务端会话：用户 ID 连同其加密后的 HMAC 一起作为 cookie 下发，
//! 每次请求由 [`TokenCodec`] 校验。

pub mod token;
pub mod user;

pub use token::{SIGNATURE_SIZE, TokenCodec};
pub use user::{User, UserStore};
