//! Common test utilities.
//!
//! - Test accounts hashed with a cheap BCrypt cost
//! - Test app builder wired like the real site
//! - Cookie helpers for the CSRF and login round trips

#![allow(dead_code)]

use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::{test, App};

use site_security_app::security::{RuleOrdering, SESSION_COOKIE_NAME};
use site_security_app::{site_service, SiteSecurity};
use site_security_core::http::security::csrf::DEFAULT_CSRF_COOKIE_NAME;
use site_security_core::http::security::{
    AuthenticationManager, BCryptPasswordEncoder, InMemoryUserDetailsService, PasswordEncoder, Role, UserAccount,
};

pub const ADMIN: (&str, &str) = ("admin@site.test", "admin-pass");
pub const VIEWER: (&str, &str) = ("viewer@site.test", "viewer-pass");
pub const MEMBER: (&str, &str) = ("member@site.test", "member-pass");
pub const DISABLED: (&str, &str) = ("disabled@site.test", "disabled-pass");

// =============================================================================
// Test Configuration
// =============================================================================

pub fn test_encoder() -> BCryptPasswordEncoder {
    BCryptPasswordEncoder::with_cost(4)
}

/// Users:
/// - admin: ADMIN, VIEW
/// - viewer: VIEW
/// - member: no roles
/// - disabled: VIEW, account disabled
pub fn test_users() -> InMemoryUserDetailsService {
    let encoder = test_encoder();
    let hash = |password: &str| encoder.encode(password).unwrap();

    AuthenticationManager::in_memory_users([
        UserAccount::new(ADMIN.0, hash(ADMIN.1)).roles([Role::Admin, Role::View]),
        UserAccount::new(VIEWER.0, hash(VIEWER.1)).roles([Role::View]),
        UserAccount::new(MEMBER.0, hash(MEMBER.1)),
        UserAccount::new(DISABLED.0, hash(DISABLED.1))
            .roles([Role::View])
            .disabled(),
    ])
}

pub fn test_key() -> Key {
    Key::from(&[7u8; 64])
}

pub async fn create_test_app() -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    create_test_app_with(RuleOrdering::Effective).await
}

pub async fn create_test_app_with(
    ordering: RuleOrdering,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let security = SiteSecurity::with_encoder(test_users(), test_encoder(), ordering, false);
    test::init_service(App::new().service(site_service(&security, test_key(), false))).await
}

// =============================================================================
// Helpers
// =============================================================================

pub fn response_cookie(resp: &ServiceResponse, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.into_owned())
}

pub fn location(resp: &ServiceResponse) -> Option<String> {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Fetches the login page and returns the CSRF cookie it issued.
pub async fn csrf_cookie<S>(app: &S) -> Cookie<'static>
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::get().uri("/login").to_request();
    let resp = test::call_service(app, req).await;
    response_cookie(&resp, DEFAULT_CSRF_COOKIE_NAME).expect("login page issues a CSRF cookie")
}

/// Posts the login form with a valid CSRF token.
pub async fn post_login<S>(app: &S, email: &str, password: &str) -> ServiceResponse
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let csrf = csrf_cookie(app).await;
    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(csrf.clone())
        .set_form([("email", email), ("password", password), ("_csrf", csrf.value())])
        .to_request();
    test::call_service(app, req).await
}

/// Logs in and returns the session cookie.
pub async fn login<S>(app: &S, credentials: (&str, &str)) -> Cookie<'static>
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = post_login(app, credentials.0, credentials.1).await;
    response_cookie(&resp, SESSION_COOKIE_NAME).expect("successful login sets the session cookie")
}

pub async fn get_as<S>(app: &S, uri: &str, session: Option<&Cookie<'static>>) -> ServiceResponse
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut req = test::TestRequest::get().uri(uri);
    if let Some(cookie) = session {
        req = req.cookie(cookie.clone());
    }
    test::call_service(app, req.to_request()).await
}
