//! Configuration traits for authentication and authorization.
//!
//! # Spring Equivalent
//! `AuthenticationProvider`, `SecurityContextRepository` and
//! `FilterSecurityInterceptor` seams

use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::Error;
use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;

use crate::http::error::AuthError;
use crate::http::security::principal::Principal;

/// Trait for finding the principal behind an HTTP request.
///
/// # Spring Equivalent
/// `SecurityContextRepository.loadContext`
///
/// Returns an owned `Principal` so it can be stored in request extensions
/// for access by handlers.
pub trait Authenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<Principal>;
}

/// Trait for verifying submitted credentials.
///
/// # Spring Equivalent
/// `AuthenticationProvider.authenticate(Authentication)`
///
/// Unknown e-mail and wrong password must both yield
/// [`AuthError::BadCredentials`].
#[async_trait(?Send)]
pub trait CredentialAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;
}

/// Trait for acting on the access decision for a request.
///
/// # Spring Equivalent
/// `FilterSecurityInterceptor` + `ExceptionTranslationFilter`
///
/// The `process` method returns a boxed future that resolves to:
/// - `EitherBody::left()` when forwarding to the inner service
/// - `EitherBody::right()` for redirects and 403 responses
pub trait Authorizer<B> {
    /// # Arguments
    /// * `req` - The incoming request
    /// * `principal` - The authenticated caller, `None` when anonymous
    /// * `next` - Closure to call the next service in the chain
    fn process(
        &self,
        req: ServiceRequest,
        principal: Option<&Principal>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>>;
}
