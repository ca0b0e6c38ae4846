use actix_web::{HttpRequest, HttpResponse, Responder, http::StatusCode, web};
use tracing::debug;

use super::internal_error;
use crate::errors::ShortenerError;
use crate::services::ShortUrlService;
use crate::storage::Context;

pub struct RedirectService;

impl RedirectService {
    /// `GET /{code}`：307 跳转到原始 URL
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        let code = path.into_inner();

        match service.expand(&Context::background(), &code).await {
            Ok(target) => HttpResponse::build(StatusCode::TEMPORARY_REDIRECT)
                .insert_header(("Location", target))
                .finish(),
            Err(ShortenerError::InvalidCharacter(msg) | ShortenerError::Validation(msg)) => {
                debug!("Invalid short code {}: {}", code, msg);
                HttpResponse::BadRequest().body("Bad Request")
            }
            Err(ShortenerError::NotFound(_)) => {
                debug!("Short code not found: {}", code);
                HttpResponse::NotFound().body("Not Found")
            }
            Err(ShortenerError::Deleted(_)) => HttpResponse::Gone().finish(),
            Err(e) => internal_error(&req, &e),
        }
    }
}
