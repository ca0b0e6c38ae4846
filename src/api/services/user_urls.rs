use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::debug;

use super::internal_error;
use crate::api::middleware::Session;
use crate::services::ShortUrlService;
use crate::storage::Context;

pub struct UserUrlsService;

impl UserUrlsService {
    /// `GET /api/user/urls`：没有链接时返回 204
    pub async fn list(
        req: HttpRequest,
        session: Session,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        match service
            .user_urls(&Context::background(), &session.user())
            .await
        {
            Ok(urls) if urls.is_empty() => HttpResponse::NoContent().finish(),
            Ok(urls) => HttpResponse::Ok().json(urls),
            Err(e) => internal_error(&req, &e),
        }
    }

    /// `DELETE /api/user/urls`：入队后立即返回 202
    pub async fn delete(
        req: HttpRequest,
        session: Session,
        body: web::Json<Vec<String>>,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        let codes = body.into_inner();
        debug!(
            "User {} requested deletion of {} codes",
            session.user_id,
            codes.len()
        );
        match service.delete(&session.user(), codes).await {
            Ok(()) => HttpResponse::Accepted().finish(),
            Err(e) => internal_error(&req, &e),
        }
    }
}
