//! Security middleware for Actix Web.
//!
//! # Spring Equivalent
//! `SecurityFilterChain` / `FilterChainProxy`

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::warn;

use crate::http::security::config::{Authenticator, Authorizer};
use crate::http::security::logout::{LogoutConfig, LogoutHandler};
use crate::http::security::request::{check_path, matching_path};
use crate::http::security::web::WebSecurity;

/// Security middleware factory.
///
/// Per request, in order: ambiguous paths are rejected with 400, ignored
/// paths pass straight through, logout
/// requests are answered, the principal is loaded and put in request
/// extensions, then the authorizer decides.
///
/// CSRF runs in its own middleware, which must sit outside this one.
///
/// # Spring Equivalent
/// `SecurityFilterChain`
///
/// # Example
/// ```ignore
/// App::new().wrap(
///     SecurityTransform::new()
///         .config_authenticator(|| SessionAuthenticator::new(SessionConfig::new()))
///         .config_authorizer(move || authorizer.clone())
///         .web_security(WebSecurity::new().ignoring(&["/static/**"]))
///         .logout(LogoutConfig::new().logout_request_matcher("/logout**"))
/// )
/// ```
pub struct SecurityTransform<Auth, Autho> {
    authenticator: Option<Rc<dyn Fn() -> Auth>>,
    authorizer: Option<Rc<dyn Fn() -> Autho>>,
    web: Rc<WebSecurity>,
    logout: Option<Rc<LogoutHandler>>,
}

impl<Auth, Autho> SecurityTransform<Auth, Autho> {
    pub fn new() -> Self {
        SecurityTransform {
            authorizer: None,
            authenticator: None,
            web: Rc::new(WebSecurity::new()),
            logout: None,
        }
    }

    pub fn config_authenticator(mut self, authenticator: impl Fn() -> Auth + 'static) -> Self {
        self.authenticator = Some(Rc::new(authenticator));
        self
    }

    pub fn config_authorizer(mut self, authorizer: impl Fn() -> Autho + 'static) -> Self {
        self.authorizer = Some(Rc::new(authorizer));
        self
    }

    /// # Spring Equivalent
    /// `WebSecurity.ignoring()`
    pub fn web_security(mut self, web: WebSecurity) -> Self {
        self.web = Rc::new(web);
        self
    }

    /// # Spring Equivalent
    /// `HttpSecurity.logout()`
    pub fn logout(mut self, config: LogoutConfig) -> Self {
        self.logout = Some(Rc::new(LogoutHandler::new(config)));
        self
    }
}

impl<Auth, Autho> Default for SecurityTransform<Auth, Autho> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B, Auth, Autho> Transform<S, ServiceRequest> for SecurityTransform<Auth, Autho>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    Auth: Authenticator + 'static,
    Autho: Authorizer<B> + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SecurityService<Auth, Autho, S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let authenticator = self.authenticator.as_ref().map(|f| f());
        let authorizer = self.authorizer.as_ref().map(|f| f());

        ok(SecurityService {
            authenticator,
            authorizer,
            web: Rc::clone(&self.web),
            logout: self.logout.clone(),
            service: Rc::new(service),
        })
    }
}

/// Security middleware service.
///
/// # Spring Equivalent
/// `FilterChainProxy`
pub struct SecurityService<Auth, Autho, S> {
    authenticator: Option<Auth>,
    authorizer: Option<Autho>,
    web: Rc<WebSecurity>,
    logout: Option<Rc<LogoutHandler>>,
    service: Rc<S>,
}

impl<Auth, Autho, S, B> Service<ServiceRequest> for SecurityService<Auth, Autho, S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    Auth: Authenticator,
    Autho: Authorizer<B>,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        if let Err(error) = check_path(req.request()) {
            warn!("Rejected request path {}", req.uri().path());
            return Box::pin(async move { Ok(req.error_response(error).map_into_right_body()) });
        }

        let path = matching_path(req.request()).to_string();
        if self.web.is_ignored(&path) {
            let fut = service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        let principal = self
            .authenticator
            .as_ref()
            .and_then(|auth| auth.get_user(&req));

        if let Some(logout) = self.logout.as_ref().filter(|l| l.config().is_logout_request(&path)) {
            let response = logout.logout(&req.get_session(), principal.as_ref());
            return Box::pin(async move { Ok(req.into_response(response.map_into_right_body())) });
        }

        // Handlers read the caller through the extractors.
        if let Some(ref p) = principal {
            req.extensions_mut().insert(p.clone());
        }

        if let Some(authorizer) = &self.authorizer {
            let next = move |req: ServiceRequest| -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>> {
                let fut = service.call(req);
                Box::pin(fut)
            };

            authorizer.process(req, principal.as_ref(), next)
        } else {
            let fut = service.call(req);
            Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            })
        }
    }
}
