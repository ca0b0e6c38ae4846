use actix_web::{HttpRequest, HttpResponse, Responder, web};
use std::time::Duration;
use tracing::trace;

use super::internal_error;
use crate::services::ShortUrlService;
use crate::storage::Context;

/// 探活超时，由启动时的配置注入
#[derive(Clone, Copy, Debug)]
pub struct PingTimeout(pub Duration);

pub struct HealthService;

impl HealthService {
    /// `GET /ping`：存储可用返回 200，否则 500
    pub async fn ping(
        req: HttpRequest,
        service: web::Data<ShortUrlService>,
        timeout: web::Data<PingTimeout>,
    ) -> impl Responder {
        let ctx = Context::with_timeout(timeout.0);
        match service.ping(&ctx).await {
            Ok(()) => {
                trace!("Ping succeeded on {}", service.storage().backend_name());
                HttpResponse::Ok().finish()
            }
            Err(e) => internal_error(&req, &e),
        }
    }
}
