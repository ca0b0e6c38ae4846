use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    cookie::Cookie,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::CONTENT_TYPE,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

use crate::auth::{TokenCodec, User, UserStore};

/// 请求级身份，由认证中间件写入 request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn user(&self) -> User {
        User::new(self.user_id.as_str())
    }
}

impl FromRequest for Session {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // 路由没有挂认证中间件时视为未认证
        ready(
            req.extensions()
                .get::<Session>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("Unauthorized")),
        )
    }
}

/// 认证模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    /// cookie 缺失或无效时签发匿名用户并下发新 cookie
    Identify,
    /// cookie 缺失或无效时直接返回 401
    Require,
}

/// 认证中间件共享的依赖
#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
    pub users: UserStore,
    pub cookie_name: String,
}

impl AuthState {
    pub fn new(codec: Arc<TokenCodec>, users: UserStore, cookie_name: impl Into<String>) -> Self {
        Self {
            codec,
            users,
            cookie_name: cookie_name.into(),
        }
    }
}

/// 基于 cookie 的用户认证中间件
#[derive(Clone)]
pub struct UserAuth {
    state: AuthState,
    mode: AuthMode,
}

impl UserAuth {
    pub fn identify(state: AuthState) -> Self {
        Self {
            state,
            mode: AuthMode::Identify,
        }
    }

    pub fn require(state: AuthState) -> Self {
        Self {
            state,
            mode: AuthMode::Require,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for UserAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = UserAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthMiddleware {
            service: Rc::new(service),
            state: self.state.clone(),
            mode: self.mode,
        }))
    }
}

pub struct UserAuthMiddleware<S> {
    service: Rc<S>,
    state: AuthState,
    mode: AuthMode,
}

impl<S, B> UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        info!("User authentication failed - invalid or missing cookie");
        req.into_response(
            HttpResponse::Unauthorized()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .body("Unauthorized")
                .map_into_right_body(),
        )
    }

    fn handle_internal_error(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::InternalServerError()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .body("Internal Server Error")
                .map_into_right_body(),
        )
    }

    /// 从 cookie 中解析并校验用户
    fn authenticate_cookie(req: &ServiceRequest, state: &AuthState) -> Option<User> {
        let cookie = req.cookie(&state.cookie_name)?;
        match state.codec.authenticate(cookie.value()) {
            Ok(user) => {
                trace!("Cookie authentication successful for {}", user.user_id);
                Some(user)
            }
            Err(e) => {
                debug!("Cookie authentication failed: {}", e);
                None
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let state = self.state.clone();
        let mode = self.mode;

        Box::pin(async move {
            let (user, new_token) = match Self::authenticate_cookie(&req, &state) {
                Some(user) => (user, None),
                None if mode == AuthMode::Require => {
                    return Ok(Self::handle_unauthorized(req));
                }
                None => {
                    let user = state.users.new_anonymous();
                    match state.codec.sign(&user.user_id) {
                        Ok(token) => {
                            debug!("Issued anonymous user {}", user.user_id);
                            (user, Some(token))
                        }
                        Err(e) => {
                            error!("{} {}: sign token: {}", req.method(), req.uri(), e);
                            return Ok(Self::handle_internal_error(req));
                        }
                    }
                }
            };

            req.extensions_mut().insert(Session {
                user_id: user.user_id,
            });

            let mut res = srv.call(req).await?;

            if let Some(token) = new_token {
                let cookie = Cookie::build(state.cookie_name.clone(), token)
                    .path("/")
                    .http_only(true)
                    .finish();
                if let Err(e) = res.response_mut().add_cookie(&cookie) {
                    error!("Failed to set auth cookie: {}", e);
                }
            }

            Ok(res.map_into_left_body())
        })
    }
}
