//! Security module providing authentication, authorization and CSRF protection.
//!
//! # Spring Equivalent
//! `org.springframework.security` package
//!
//! # Module Structure
//!
//! - `ant_matcher` - Ant-style URL pattern matching
//! - `authorizer` - Ordered rule table (PolicyEvaluator) and its middleware executor
//! - `csrf` - CSRF applicability predicate, cookie token repository, middleware
//! - `authenticator` - DAO authentication provider (user lookup + BCrypt)
//! - `config` - Core traits (Authenticator, Authorizer, CredentialAuthenticator)
//! - `crypto` - Password encoding (BCrypt)
//! - `session` - Principal and saved request in the actix-session
//! - `form_login` - Login form processing and redirects
//! - `logout` - Logout matcher, session invalidation, cookie removal
//! - `access_denied` - 403 rendering
//! - `extractor` - Actix Web extractors (AuthenticatedPrincipal, OptionalPrincipal)
//! - `manager` - Factory methods (AuthenticationManager, AuthorizationManager)
//! - `middleware` - Security middleware (SecurityTransform)
//! - `principal`, `role`, `request` - Identity and request models
//! - `user_details` - Account lookup by e-mail
//! - `web` - Ignored paths

pub use access_denied::{AccessDeniedHandler, DefaultAccessDeniedHandler};
pub use ant_matcher::{AntMatcher, AntMatchers};
pub use authenticator::DaoAuthenticationProvider;
pub use authorizer::{Access, AccessDecision, AccessRule, PolicyEvaluator, RequestMatcher, RequestMatcherAuthorizer};
pub use config::{Authenticator, Authorizer, CredentialAuthenticator};
pub use crypto::{BCryptPasswordEncoder, CryptoError, PasswordEncoder};
pub use csrf::{
    requires_csrf_token, CookieCsrfTokenRepository, CsrfConfig, CsrfError, CsrfProtection, CsrfRequireMatcher,
    CsrfToken, CsrfTokenRepository,
};
pub use extractor::{AuthenticatedPrincipal, OptionalPrincipal, SecurityExt};
pub use form_login::{FormLoginConfig, FormLoginError, FormLoginHandler, FormLoginService, LoginForm};
pub use logout::{LogoutConfig, LogoutHandler};
pub use manager::{AuthenticationManager, AuthorizationManager};
pub use middleware::SecurityTransform;
pub use principal::Principal;
pub use request::{check_path, matching_path, RequestDescriptor};
pub use role::{Role, UnknownRole};
pub use session::{SessionAuthenticator, SessionConfig, SessionError, SessionFixationStrategy};
pub use user_details::{InMemoryUserDetailsService, UserAccount, UserDetailsError, UserDetailsService};
pub use web::WebSecurity;

mod config;
mod extractor;

pub mod access_denied;
pub mod ant_matcher;
pub mod authenticator;
pub mod authorizer;
pub mod crypto;
pub mod csrf;
pub mod form_login;
pub mod logout;
pub mod manager;
pub mod middleware;
pub mod principal;
pub mod request;
pub mod role;
pub mod session;
pub mod user_details;
pub mod web;
