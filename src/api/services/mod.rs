pub mod health;
pub mod redirect;
pub mod shorten;
pub mod user_urls;

pub use health::HealthService;
pub use redirect::RedirectService;
pub use shorten::ShortenService;
pub use user_urls::UserUrlsService;

use actix_web::{HttpRequest, HttpResponse, http::header::CONTENT_TYPE};
use tracing::error;

use crate::errors::ShortenerError;

/// 记录 "method uri: err" 并返回不透明的 500
pub(crate) fn internal_error(req: &HttpRequest, err: &ShortenerError) -> HttpResponse {
    error!("{} {}: {}", req.method(), req.uri(), err);
    HttpResponse::InternalServerError()
        .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
        .body("An error has occured")
}
