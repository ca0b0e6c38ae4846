use actix_web::{HttpRequest, HttpResponse, Responder, http::header::CONTENT_TYPE, web};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::internal_error;
use crate::api::middleware::Session;
use crate::services::{CorrelatedOrigUrl, ShortUrlService, Shortened};
use crate::storage::Context;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

pub struct ShortenService;

impl ShortenService {
    /// `POST /`：纯文本 URL，返回纯文本短链接
    pub async fn shorten_text(
        req: HttpRequest,
        session: Session,
        body: String,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        trace!("Shorten text request from {}", session.user_id);
        match service
            .shorten(&Context::background(), &session.user(), &body)
            .await
        {
            Ok(shortened) => {
                let mut builder = Self::status_for(&shortened);
                builder
                    .insert_header((CONTENT_TYPE, "text/plain"))
                    .body(shortened.into_short_url())
            }
            Err(e) => internal_error(&req, &e),
        }
    }

    /// `POST /api/shorten`：`{"url": ...}` -> `{"result": ...}`
    pub async fn shorten_json(
        req: HttpRequest,
        session: Session,
        body: web::Json<ShortenRequest>,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        match service
            .shorten(&Context::background(), &session.user(), &body.url)
            .await
        {
            Ok(shortened) => Self::status_for(&shortened).json(ShortenResponse {
                result: shortened.into_short_url(),
            }),
            Err(e) => internal_error(&req, &e),
        }
    }

    /// `POST /api/shorten/batch`：结果与请求同序
    pub async fn shorten_batch(
        req: HttpRequest,
        session: Session,
        body: web::Json<Vec<CorrelatedOrigUrl>>,
        service: web::Data<ShortUrlService>,
    ) -> impl Responder {
        match service
            .shorten_many(&Context::background(), &session.user(), body.into_inner())
            .await
        {
            Ok(urls) => HttpResponse::Created().json(urls),
            Err(e) => internal_error(&req, &e),
        }
    }

    /// 新建 201，已存在 409
    fn status_for(shortened: &Shortened) -> actix_web::HttpResponseBuilder {
        match shortened {
            Shortened::Created(_) => HttpResponse::Created(),
            Shortened::Existing(_) => HttpResponse::Conflict(),
        }
    }
}
