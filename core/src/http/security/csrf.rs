//! CSRF (Cross-Site Request Forgery) Protection.
//!
//! # Spring Security Equivalent
//! `CsrfFilter` with a custom `requireCsrfProtectionMatcher` and
//! `CookieCsrfTokenRepository.withHttpOnlyFalse()`
//!
//! # Behavior
//! 1. Ignored paths pass through untouched.
//! 2. The token is loaded from the `XSRF-TOKEN` cookie, or generated and
//!    written back as that cookie on the response.
//! 3. The token is placed in request extensions as [`CsrfToken`].
//! 4. When [`CsrfRequireMatcher`] says the request needs a token, the
//!    presented token (header, query or form field) must equal it; otherwise
//!    the access-denied handler answers 403 and the inner service never runs.
//!
//! # Example
//! ```rust,ignore
//! use site_security_core::http::security::csrf::{CsrfConfig, CsrfProtection};
//!
//! App::new()
//!     .wrap(security_transform)
//!     .wrap(CsrfProtection::new(CsrfConfig::new()))
//!     .wrap(session_middleware)
//!
//! // In templates:
//! // <input type="hidden" name="_csrf" value="{{csrf_token}}">
//! // For AJAX, send the cookie value back in `X-XSRF-TOKEN`.
//! ```

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, LazyLock};

use actix_web::cookie::Cookie;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::{body::EitherBody, web, Error, HttpMessage, HttpRequest};
use derive_more::Display;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::{debug, warn};
use rand::Rng;
use regex::Regex;

use crate::http::error::AuthError;
use crate::http::security::access_denied::{AccessDeniedHandler, DefaultAccessDeniedHandler};
use crate::http::security::request::{check_path, matching_path, RequestDescriptor};
use crate::http::security::web::WebSecurity;

pub const DEFAULT_CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const DEFAULT_CSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";
pub const DEFAULT_CSRF_PARAMETER_NAME: &str = "_csrf";

/// Methods that never carry a token.
pub const DEFAULT_ALLOWED_METHODS: &str = "^(GET|HEAD|TRACE|OPTIONS)$";
/// Referer fragment that exempts a request from the token check.
pub const SWAGGER_UI_REFERER: &str = "/swagger-ui";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

static DEFAULT_MATCHER: LazyLock<CsrfRequireMatcher> = LazyLock::new(CsrfRequireMatcher::new);

/// Whether a request with this method and `Referer` must present a CSRF token.
///
/// - `GET`, `HEAD`, `TRACE` and `OPTIONS` (exact, case-sensitive) never do.
/// - Otherwise a `Referer` containing `/swagger-ui` exempts the request.
/// - Everything else does.
///
/// ```
/// use site_security_core::http::security::csrf::requires_csrf_token;
///
/// assert!(!requires_csrf_token("GET", None));
/// assert!(requires_csrf_token("POST", None));
/// assert!(!requires_csrf_token("POST", Some("https://x/swagger-ui/index.html")));
/// assert!(requires_csrf_token("get", None));
/// ```
pub fn requires_csrf_token(method: &str, referer: Option<&str>) -> bool {
    DEFAULT_MATCHER.requires_token(method, referer)
}

// =============================================================================
// CSRF Require Matcher
// =============================================================================

/// Decides which requests need a CSRF token.
///
/// # Spring Security Equivalent
/// `csrf().requireCsrfProtectionMatcher(RequestMatcher)`
#[derive(Debug, Clone)]
pub struct CsrfRequireMatcher {
    allowed_methods: Regex,
    exempt_referers: Vec<String>,
}

impl Default for CsrfRequireMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfRequireMatcher {
    /// Exempts safe methods and requests coming from Swagger UI.
    pub fn new() -> Self {
        CsrfRequireMatcher {
            allowed_methods: whole_match(DEFAULT_ALLOWED_METHODS).expect("valid method pattern"),
            exempt_referers: vec![SWAGGER_UI_REFERER.to_string()],
        }
    }

    /// Replaces the exempt method pattern. The pattern must match the
    /// whole method name.
    pub fn allowed_methods(mut self, pattern: &str) -> Result<Self, CsrfError> {
        self.allowed_methods = whole_match(pattern).map_err(|e| CsrfError::InvalidMethodPattern(e.to_string()))?;
        Ok(self)
    }

    /// Adds a `Referer` substring that exempts a request.
    pub fn exempt_referer(mut self, fragment: &str) -> Self {
        self.exempt_referers.push(fragment.to_string());
        self
    }

    /// Removes every exempt `Referer` fragment.
    pub fn clear_exempt_referers(mut self) -> Self {
        self.exempt_referers.clear();
        self
    }

    pub fn requires_token(&self, method: &str, referer: Option<&str>) -> bool {
        if self.allowed_methods.is_match(method) {
            return false;
        }
        match referer {
            Some(referer) => !self
                .exempt_referers
                .iter()
                .any(|fragment| referer.contains(fragment.as_str())),
            None => true,
        }
    }

    pub fn matches(&self, req: &RequestDescriptor) -> bool {
        self.requires_token(&req.method, req.referer())
    }
}

fn whole_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

// =============================================================================
// CSRF Token
// =============================================================================

/// CSRF Token.
///
/// # Spring Security Equivalent
/// `CsrfToken` / `DefaultCsrfToken`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub token: String,
    pub header_name: String,
    pub parameter_name: String,
}

impl CsrfToken {
    pub fn new(token: String) -> Self {
        Self::with_names(token, DEFAULT_CSRF_HEADER_NAME, DEFAULT_CSRF_PARAMETER_NAME)
    }

    pub fn with_names(token: String, header_name: &str, parameter_name: &str) -> Self {
        Self {
            token,
            header_name: header_name.to_string(),
            parameter_name: parameter_name.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.token
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
}

// =============================================================================
// CSRF Token Repository
// =============================================================================

/// Trait for storing and retrieving CSRF tokens.
///
/// # Spring Security Equivalent
/// `CsrfTokenRepository`
pub trait CsrfTokenRepository: Send + Sync {
    fn generate_token(&self) -> CsrfToken;

    /// Writes the token to the response headers.
    fn save_token(&self, token: &CsrfToken, headers: &mut HeaderMap) -> Result<(), CsrfError>;

    /// Tells the client to forget its token.
    fn clear_token(&self, headers: &mut HeaderMap) -> Result<(), CsrfError>;

    fn load_token(&self, req: &HttpRequest) -> Option<CsrfToken>;
}

/// Token kept in a cookie that page scripts can read.
///
/// # Spring Security Equivalent
/// `CookieCsrfTokenRepository`
#[derive(Debug, Clone)]
pub struct CookieCsrfTokenRepository {
    cookie_name: String,
    header_name: String,
    parameter_name: String,
    cookie_path: String,
    cookie_http_only: bool,
    secure: bool,
}

impl Default for CookieCsrfTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieCsrfTokenRepository {
    /// HttpOnly cookie, like Spring's constructor.
    pub fn new() -> Self {
        Self {
            cookie_name: DEFAULT_CSRF_COOKIE_NAME.to_string(),
            header_name: DEFAULT_CSRF_HEADER_NAME.to_string(),
            parameter_name: DEFAULT_CSRF_PARAMETER_NAME.to_string(),
            cookie_path: "/".to_string(),
            cookie_http_only: true,
            secure: false,
        }
    }

    /// # Spring Security Equivalent
    /// `CookieCsrfTokenRepository.withHttpOnlyFalse()`
    pub fn with_http_only_false() -> Self {
        Self {
            cookie_http_only: false,
            ..Self::new()
        }
    }

    pub fn cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    pub fn header_name(mut self, name: &str) -> Self {
        self.header_name = name.to_string();
        self
    }

    pub fn parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = name.to_string();
        self
    }

    pub fn cookie_path(mut self, path: &str) -> Self {
        self.cookie_path = path.to_string();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn get_cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), value);
        cookie.set_path(self.cookie_path.clone());
        cookie.set_http_only(self.cookie_http_only);
        cookie.set_secure(self.secure);
        cookie
    }

    fn append(cookie: &Cookie<'_>, headers: &mut HeaderMap) -> Result<(), CsrfError> {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| CsrfError::InvalidHeaderValue(e.to_string()))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    fn generate_token_value(&self) -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(&bytes)
    }
}

impl CsrfTokenRepository for CookieCsrfTokenRepository {
    fn generate_token(&self) -> CsrfToken {
        CsrfToken::with_names(self.generate_token_value(), &self.header_name, &self.parameter_name)
    }

    fn save_token(&self, token: &CsrfToken, headers: &mut HeaderMap) -> Result<(), CsrfError> {
        Self::append(&self.cookie(token.token.clone()), headers)
    }

    fn clear_token(&self, headers: &mut HeaderMap) -> Result<(), CsrfError> {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();
        Self::append(&cookie, headers)
    }

    fn load_token(&self, req: &HttpRequest) -> Option<CsrfToken> {
        let cookie = req.cookie(&self.cookie_name)?;
        if cookie.value().is_empty() {
            return None;
        }
        Some(CsrfToken::with_names(
            cookie.value().to_string(),
            &self.header_name,
            &self.parameter_name,
        ))
    }
}

// =============================================================================
// CSRF Configuration
// =============================================================================

/// CSRF protection configuration.
///
/// # Spring Security Equivalent
/// `CsrfConfigurer`
#[derive(Clone)]
pub struct CsrfConfig {
    repository: Arc<dyn CsrfTokenRepository>,
    require_matcher: CsrfRequireMatcher,
    web: WebSecurity,
    access_denied_handler: Arc<dyn AccessDeniedHandler>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfConfig {
    /// Readable `XSRF-TOKEN` cookie, Swagger-aware require matcher and a
    /// plain 403 on rejection.
    pub fn new() -> Self {
        Self {
            repository: Arc::new(CookieCsrfTokenRepository::with_http_only_false()),
            require_matcher: CsrfRequireMatcher::new(),
            web: WebSecurity::new(),
            access_denied_handler: Arc::new(DefaultAccessDeniedHandler),
        }
    }

    pub fn repository<R: CsrfTokenRepository + 'static>(mut self, repository: R) -> Self {
        self.repository = Arc::new(repository);
        self
    }

    pub fn shared_repository(mut self, repository: Arc<dyn CsrfTokenRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn require_matcher(mut self, matcher: CsrfRequireMatcher) -> Self {
        self.require_matcher = matcher;
        self
    }

    /// Paths skipped entirely: no token is loaded, generated or checked.
    pub fn web_security(mut self, web: WebSecurity) -> Self {
        self.web = web;
        self
    }

    pub fn access_denied_handler<H: AccessDeniedHandler + 'static>(mut self, handler: H) -> Self {
        self.access_denied_handler = Arc::new(handler);
        self
    }

    pub fn shared_access_denied_handler(mut self, handler: Arc<dyn AccessDeniedHandler>) -> Self {
        self.access_denied_handler = handler;
        self
    }

    pub fn get_repository(&self) -> Arc<dyn CsrfTokenRepository> {
        Arc::clone(&self.repository)
    }

    pub fn get_require_matcher(&self) -> &CsrfRequireMatcher {
        &self.require_matcher
    }
}

// =============================================================================
// CSRF Protection Middleware
// =============================================================================

/// CSRF protection middleware.
///
/// # Spring Security Equivalent
/// `CsrfFilter`
#[derive(Clone)]
pub struct CsrfProtection {
    config: CsrfConfig,
}

impl CsrfProtection {
    pub fn new(config: CsrfConfig) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfProtection
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CsrfMiddleware {
            service: Rc::new(service),
            config: self.config.clone(),
        })
    }
}

/// CSRF middleware service.
pub struct CsrfMiddleware<S> {
    service: Rc<S>,
    config: CsrfConfig,
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if let Err(error) = check_path(req.request()) {
                warn!("Rejected request path {}", req.uri().path());
                return Ok(req.error_response(error).map_into_right_body());
            }

            if config.web.is_ignored(matching_path(req.request())) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let (token, generated) = match config.repository.load_token(req.request()) {
                Some(token) => (token, false),
                None => (config.repository.generate_token(), true),
            };
            req.extensions_mut().insert(token.clone());

            let descriptor = RequestDescriptor::from(&req);
            if config.require_matcher.matches(&descriptor) {
                let presented = presented_token(&mut req, &token).await?;
                let rejection = match presented {
                    Some(value) if constant_time_eq(value.as_bytes(), token.token.as_bytes()) => None,
                    _ if generated => Some(AuthError::MissingCsrfToken),
                    _ => Some(AuthError::InvalidCsrfToken),
                };

                if let Some(error) = rejection {
                    warn!(
                        "{} for {} {}",
                        error, descriptor.method, descriptor.path
                    );
                    let mut response = config.access_denied_handler.handle(req.request(), &error);
                    if generated {
                        save_token(&config, &token, response.headers_mut());
                    }
                    return Ok(req.into_response(response.map_into_right_body()));
                }
            }

            let mut res = service.call(req).await?;
            if generated {
                save_token(&config, &token, res.headers_mut());
            }
            Ok(res.map_into_left_body())
        })
    }
}

fn save_token(config: &CsrfConfig, token: &CsrfToken, headers: &mut HeaderMap) {
    if let Err(e) = config.repository.save_token(token, headers) {
        warn!("Could not write CSRF token: {}", e);
    }
}

/// Token sent by the client: header first, then query string, then an
/// url-encoded form body. The body is put back for the handler.
async fn presented_token(req: &mut ServiceRequest, token: &CsrfToken) -> Result<Option<String>, Error> {
    if let Some(value) = req.headers().get(token.header_name()) {
        if let Ok(value) = value.to_str() {
            return Ok(Some(value.to_string()));
        }
    }

    if let Some(value) = form_param(req.query_string().as_bytes(), token.parameter_name()) {
        return Ok(Some(value));
    }

    if req.content_type() != FORM_CONTENT_TYPE {
        return Ok(None);
    }

    let body = req.extract::<web::Bytes>().await?;
    let value = form_param(&body, token.parameter_name());
    debug!("Read {} byte form body for CSRF check", body.len());

    let (_, mut payload) = actix_http::h1::Payload::create(true);
    payload.unread_data(body);
    req.set_payload(payload.into());

    Ok(value)
}

fn form_param(encoded: &[u8], name: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<HashMap<String, String>>(encoded)
        .ok()
        .and_then(|mut params| params.remove(name))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// CSRF Error
// =============================================================================

/// CSRF configuration and storage errors.
#[derive(Debug, Display, derive_more::Error, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[display("invalid CSRF method pattern: {_0}")]
    InvalidMethodPattern(#[error(not(source))] String),
    #[display("invalid CSRF cookie header: {_0}")]
    InvalidHeaderValue(#[error(not(source))] String),
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: &[u8]) -> String {
        bytes
            .iter()
            .flat_map(|byte| [HEX_CHARS[(byte >> 4) as usize], HEX_CHARS[(byte & 0x0f) as usize]])
            .map(char::from)
            .collect()
    }
}
