//! 短码随机源

use super::base62;

/// 64 位随机数来源
pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;
}

/// 基于线程本地 RNG 的随机源
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64(&self) -> u64 {
        rand::random::<u64>()
    }
}

/// 生成一个新的短码
pub fn generate_code(random: &dyn RandomSource) -> String {
    base62::encode(random.next_u64())
}
