use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::middleware::AuthState;
use crate::auth::{TokenCodec, UserStore};
use crate::config::StaticConfig;
use crate::deletion::{DeletionManager, DeletionSettings};
use crate::services::ShortUrlService;
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub service: ShortUrlService,
    pub auth: AuthState,
    pub ping_timeout: Duration,
    /// 删除管线的后台任务，关闭时等待它结束
    pub deletion_worker: JoinHandle<()>,
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.storage)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let (deletion, deletion_worker) =
        DeletionManager::spawn(storage.clone(), DeletionSettings::from(&config.deletion));

    let service = ShortUrlService::new(config.server.base_url.clone(), storage, deletion);

    let auth = AuthState::new(
        Arc::new(TokenCodec::new(config.auth.secret.as_bytes())),
        UserStore::default(),
        config.auth.cookie_name.clone(),
    );

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        service,
        auth,
        ping_timeout: config.ping.timeout(),
        deletion_worker,
    })
}
