use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// 获取全局配置
///
/// 未初始化时返回默认配置。返回的 Arc 克隆开销很小，且不持有锁。
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// 安装全局配置（启动时调用一次；重复调用会替换旧值）
pub fn init_config(config: StaticConfig) {
    match CONFIG.get() {
        Some(existing) => existing.store(Arc::new(config)),
        None => {
            if let Err(config) = CONFIG.set(ArcSwap::from_pointee(config)) {
                // 并发初始化时以后到者为准
                if let Some(existing) = CONFIG.get() {
                    existing.store(config.load_full());
                }
            }
        }
    }
}
