//! Server mode
//!
//! 启动 HTTP 服务；服务退出后关闭删除管线。

use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::Result;
use tracing::{info, warn};

use crate::api::middleware::RequestLogger;
use crate::api::{PingTimeout, configure_routes};
use crate::config::get_config;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let config = get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let service = web::Data::new(startup.service);
    let ping_timeout = web::Data::new(PingTimeout(startup.ping_timeout));
    let auth = startup.auth;

    let workers = config.server.workers.clamp(1, 32);
    warn!("Using {} workers for the server", workers);

    let app_service = service.clone();
    let server = HttpServer::new(move || {
        let auth = auth.clone();
        App::new()
            .wrap(RequestLogger)
            .wrap(Compress::default())
            .app_data(app_service.clone())
            .app_data(ping_timeout.clone())
            .configure(|cfg| configure_routes(cfg, auth))
    })
    .workers(workers);

    warn!("Starting server at http://{}", config.server.address);
    // actix 自行处理 SIGINT / SIGTERM 并优雅退出
    server.bind(config.server.address.as_str())?.run().await?;

    info!("HTTP server stopped, draining deletion pipeline...");
    // 最后一个 DeletionManager 句柄随服务一起释放，通道随之关闭
    drop(service);
    lifetime::shutdown::drain_deletion_pipeline(startup.deletion_worker).await;

    Ok(())
}
