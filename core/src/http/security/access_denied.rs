//! Rendering of rejected requests.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.web.access.AccessDeniedHandler`

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};

use crate::http::error::AuthError;

/// Builds the response for a request that is authenticated but not allowed,
/// or that failed the CSRF check.
///
/// Implementations must answer with `403 Forbidden`.
pub trait AccessDeniedHandler: Send + Sync {
    fn handle(&self, req: &HttpRequest, error: &AuthError) -> HttpResponse;
}

/// Plain-text 403.
///
/// # Spring Security Equivalent
/// `AccessDeniedHandlerImpl` without an error page
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAccessDeniedHandler;

impl AccessDeniedHandler for DefaultAccessDeniedHandler {
    fn handle(&self, _req: &HttpRequest, error: &AuthError) -> HttpResponse {
        HttpResponse::build(StatusCode::FORBIDDEN).body(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;
    use actix_web::test::TestRequest;

    #[test]
    fn test_default_handler() {
        let req = TestRequest::get().uri("/v/users").to_http_request();
        let res = DefaultAccessDeniedHandler.handle(&req, &AuthError::InvalidCsrfToken);
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body = res.into_body().try_into_bytes().unwrap();
        assert_eq!(body, "invalid CSRF token");
    }
}
