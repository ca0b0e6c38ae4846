//! HTTP 接口
//!
//! 路由、认证中间件和请求日志。业务逻辑在 [`crate::services`]。

pub mod middleware;
pub mod services;

use actix_web::web;

use middleware::{AuthState, UserAuth};
use services::{HealthService, RedirectService, ShortenService, UserUrlsService};

pub use services::health::PingTimeout;

/// 注册全部路由
///
/// 调用方需要通过 `app_data` 提供 `web::Data<ShortUrlService>` 和
/// `web::Data<PingTimeout>`。
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth: AuthState) {
    // 请求体不强制 Content-Type: application/json
    cfg.app_data(web::JsonConfig::default().content_type_required(false))
        .route("/ping", web::get().to(HealthService::ping))
        .route(
            "/",
            web::post()
                .to(ShortenService::shorten_text)
                .wrap(UserAuth::identify(auth.clone())),
        )
        .route(
            "/api/shorten",
            web::post()
                .to(ShortenService::shorten_json)
                .wrap(UserAuth::identify(auth.clone())),
        )
        .route(
            "/api/shorten/batch",
            web::post()
                .to(ShortenService::shorten_batch)
                .wrap(UserAuth::identify(auth.clone())),
        )
        .service(
            web::resource("/api/user/urls")
                .route(
                    web::get()
                        .to(UserUrlsService::list)
                        .wrap(UserAuth::require(auth.clone())),
                )
                .route(
                    web::delete()
                        .to(UserUrlsService::delete)
                        .wrap(UserAuth::identify(auth.clone())),
                ),
        )
        .route(
            "/{code}",
            web::get()
                .to(RedirectService::handle_redirect)
                .wrap(UserAuth::identify(auth)),
        );
}
