//! The site: configuration, security wiring and route handlers.
//!
//! The middleware stack is, from the outside in: session, CSRF, security.

use actix_web::cookie::Key;
use actix_web::dev::HttpServiceFactory;
use actix_web::web;

pub mod config;
pub mod handlers;
pub mod security;

pub use security::SiteSecurity;

/// Every route of the site behind the session, CSRF and security middleware.
///
/// ```ignore
/// App::new().service(site_security_app::site_service(&security, key, false))
/// ```
pub fn site_service(security: &SiteSecurity, key: Key, secure_cookies: bool) -> impl HttpServiceFactory {
    web::scope("")
        .app_data(web::Data::new(security.form_login.clone()))
        .app_data(web::Data::new(security.users.clone()))
        .wrap(security.transform())
        .wrap(security.csrf_protection())
        .wrap(crate::security::session_middleware(key, secure_cookies))
        .configure(handlers::configure)
}
