//! Extractors for accessing the principal in handlers.
//!
//! # Spring Equivalent
//! `@AuthenticationPrincipal` / `SecurityContextHolder`

use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::http::error::AuthError;
use crate::http::security::csrf::CsrfToken;
use crate::http::security::principal::Principal;
use crate::http::security::role::Role;

/// Extractor for the authenticated principal.
///
/// # Usage
/// ```ignore
/// async fn handler(principal: AuthenticatedPrincipal) -> impl Responder {
///     format!("Hello, {}!", principal.get_username())
/// }
/// ```
///
/// # Errors
/// Returns `401 Unauthorized` if the request is anonymous.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(Principal);

impl AuthenticatedPrincipal {
    pub fn new(principal: Principal) -> Self {
        AuthenticatedPrincipal(principal)
    }

    pub fn into_inner(self) -> Principal {
        self.0
    }
}

impl Deref for AuthenticatedPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedPrincipal {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Principal>().cloned() {
            Some(principal) => ready(Ok(AuthenticatedPrincipal(principal))),
            None => ready(Err(AuthError::Unauthorized)),
        }
    }
}

/// Optional extractor; `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(Option<Principal>);

impl OptionalPrincipal {
    pub fn into_inner(self) -> Option<Principal> {
        self.0
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl Deref for OptionalPrincipal {
    type Target = Option<Principal>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for OptionalPrincipal {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalPrincipal(req.extensions().get::<Principal>().cloned())))
    }
}

/// Extension trait for HttpRequest to inspect the security context.
pub trait SecurityExt {
    fn get_principal(&self) -> Option<Principal>;

    fn is_authenticated(&self) -> bool;

    fn has_role(&self, role: Role) -> bool;

    fn has_any_role(&self, roles: &[Role]) -> bool;

    /// The CSRF token placed by the CSRF middleware, for rendering forms.
    fn csrf_token(&self) -> Option<CsrfToken>;
}

impl SecurityExt for HttpRequest {
    fn get_principal(&self) -> Option<Principal> {
        self.extensions().get::<Principal>().cloned()
    }

    fn is_authenticated(&self) -> bool {
        self.extensions().get::<Principal>().is_some()
    }

    fn has_role(&self, role: Role) -> bool {
        self.extensions()
            .get::<Principal>()
            .is_some_and(|p| p.has_role(role))
    }

    fn has_any_role(&self, roles: &[Role]) -> bool {
        self.extensions()
            .get::<Principal>()
            .is_some_and(|p| p.has_any_role(roles))
    }

    fn csrf_token(&self) -> Option<CsrfToken> {
        self.extensions().get::<CsrfToken>().cloned()
    }
}
