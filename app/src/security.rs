//! The site's security configuration.
//!
//! # Spring Equivalent
//! `WebSecurityConfig extends WebSecurityConfigurerAdapter`

use std::str::FromStr;
use std::sync::Arc;

use actix_session::config::CookieContentSecurity;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse};
use derive_more::{Display, Error};
use log::warn;

use site_security_core::http::error::AuthError;
use site_security_core::http::security::{
    Access, AccessDeniedHandler, AuthenticationManager, BCryptPasswordEncoder,
    CookieCsrfTokenRepository, CsrfConfig, CsrfProtection, CsrfRequireMatcher, CsrfTokenRepository,
    DaoAuthenticationProvider, FormLoginConfig, FormLoginHandler, FormLoginService, InMemoryUserDetailsService,
    LogoutConfig, PolicyEvaluator, RequestMatcherAuthorizer, Role, SecurityTransform, SessionAuthenticator,
    SessionConfig, WebSecurity,
};

pub const SESSION_COOKIE_NAME: &str = "JSESSIONID";
pub const LOGIN_PAGE: &str = "/login";
pub const DEFAULT_SUCCESS_URL: &str = "/v";
pub const FAILURE_URL: &str = "/login?error=1";
pub const LOGOUT_PATTERN: &str = "/logout**";
pub const LOGOUT_SUCCESS_URL: &str = "/login?logout";
pub const USERNAME_PARAMETER: &str = "email";
pub const PASSWORD_PARAMETER: &str = "password";

/// Served with no security processing at all.
pub const IGNORED_PATHS: [&str; 6] = [
    "/images/**",
    "/scripts/**",
    "/styles/**",
    "/static/**",
    "/api-docs",
    "/api-docs/**",
];

/// Where the blanket `/**` permit sits in the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleOrdering {
    /// Role rules first, then `/**` permitAll, then any request authenticated.
    /// `/v/**` and Swagger UI are protected.
    #[default]
    Effective,
    /// `/**` permitAll first, exactly as declared. Every path is allowed.
    Declared,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown rule ordering: {value} (expected effective or declared)")]
pub struct UnknownRuleOrdering {
    #[error(not(source))]
    pub value: String,
}

impl FromStr for RuleOrdering {
    type Err = UnknownRuleOrdering;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "effective" => Ok(RuleOrdering::Effective),
            "declared" => Ok(RuleOrdering::Declared),
            _ => Err(UnknownRuleOrdering { value: s.to_string() }),
        }
    }
}

pub fn web_security() -> WebSecurity {
    WebSecurity::new().ignoring(&IGNORED_PATHS)
}

/// The site's `authorizeRequests()` table.
pub fn policy_evaluator(ordering: RuleOrdering) -> PolicyEvaluator {
    let policy = PolicyEvaluator::new().web_security(web_security());
    let policy = match ordering {
        RuleOrdering::Declared => policy.add_rule(&["/**"], Access::PermitAll),
        RuleOrdering::Effective => policy,
    };
    let policy = policy
        .add_rule(&["/v/users"], Access::HasRole(Role::Admin))
        .add_rule(&["/v", "/v/**"], Access::HasRole(Role::View))
        .add_rule(&["/swagger-ui.html", "/swagger-ui/**"], Access::HasRole(Role::View));
    let policy = match ordering {
        RuleOrdering::Effective => policy.add_rule(&["/**"], Access::PermitAll),
        RuleOrdering::Declared => policy,
    };
    policy.any_request(Access::Authenticated)
}

pub fn csrf_token_repository(secure: bool) -> CookieCsrfTokenRepository {
    CookieCsrfTokenRepository::with_http_only_false().secure(secure)
}

pub fn session_config() -> SessionConfig {
    SessionConfig::new()
}

pub fn form_login_config() -> FormLoginConfig {
    FormLoginConfig::new()
        .login_page(LOGIN_PAGE)
        .default_success_url(DEFAULT_SUCCESS_URL)
        .always_use_default_success_url(true)
        .username_parameter(USERNAME_PARAMETER)
        .password_parameter(PASSWORD_PARAMETER)
        .failure_url(FAILURE_URL)
}

pub fn logout_config() -> LogoutConfig {
    LogoutConfig::new()
        .logout_request_matcher(LOGOUT_PATTERN)
        .invalidate_http_session(true)
        .delete_cookies(&[SESSION_COOKIE_NAME])
        .logout_success_url(LOGOUT_SUCCESS_URL)
        .session_config(session_config())
}

/// Cookie-backed session named `JSESSIONID`.
pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE_NAME.to_string())
        .cookie_secure(secure)
        .cookie_content_security(CookieContentSecurity::Private)
        .build()
}

/// HTML 403 page for denied requests and CSRF failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebAccessDeniedHandler;

impl AccessDeniedHandler for WebAccessDeniedHandler {
    fn handle(&self, req: &HttpRequest, error: &AuthError) -> HttpResponse {
        warn!("Access denied: {} {} ({})", req.method(), req.path(), error);
        let message = if error.is_csrf() {
            "Your session form has expired. Reload the page and try again."
        } else {
            "You do not have permission to view this page."
        };
        HttpResponse::build(StatusCode::FORBIDDEN)
            .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
            .body(format!(
                "<!DOCTYPE html>\n<html>\n<head><title>Access denied</title></head>\n<body>\n    \
                 <h1>403 Access denied</h1>\n    <p>{}</p>\n    <a href=\"/\">Home</a>\n</body>\n</html>",
                message
            ))
    }
}

/// Every security component the app wires in, built once and cloned into
/// each worker.
#[derive(Clone)]
pub struct SiteSecurity {
    pub policy: Arc<PolicyEvaluator>,
    pub session: SessionConfig,
    pub csrf: CsrfConfig,
    pub logout: LogoutConfig,
    pub form_login: FormLoginService<DaoAuthenticationProvider>,
    pub users: InMemoryUserDetailsService,
    access_denied: Arc<dyn AccessDeniedHandler>,
}

impl SiteSecurity {
    pub fn new(users: InMemoryUserDetailsService, ordering: RuleOrdering, secure_cookies: bool) -> Self {
        Self::with_encoder(users, BCryptPasswordEncoder::new(), ordering, secure_cookies)
    }

    pub fn with_encoder(
        users: InMemoryUserDetailsService,
        encoder: BCryptPasswordEncoder,
        ordering: RuleOrdering,
        secure_cookies: bool,
    ) -> Self {
        let access_denied: Arc<dyn AccessDeniedHandler> = Arc::new(WebAccessDeniedHandler);
        let csrf_repository: Arc<dyn CsrfTokenRepository> = Arc::new(csrf_token_repository(secure_cookies));

        let csrf = CsrfConfig::new()
            .shared_repository(Arc::clone(&csrf_repository))
            .require_matcher(CsrfRequireMatcher::new())
            .web_security(web_security())
            .shared_access_denied_handler(Arc::clone(&access_denied));

        let logout = logout_config().csrf_token_repository(Arc::clone(&csrf_repository));

        let provider = AuthenticationManager::dao_authentication(users.clone(), encoder);
        let handler =
            FormLoginHandler::new(form_login_config(), session_config()).csrf_token_repository(csrf_repository);

        SiteSecurity {
            policy: Arc::new(policy_evaluator(ordering)),
            session: session_config(),
            csrf,
            logout,
            form_login: FormLoginService::new(provider, handler),
            users,
            access_denied,
        }
    }

    pub fn authorizer(&self) -> RequestMatcherAuthorizer {
        RequestMatcherAuthorizer::from_arc(Arc::clone(&self.policy))
            .login_url(LOGIN_PAGE)
            .shared_access_denied_handler(Arc::clone(&self.access_denied))
            .save_requests(self.session.clone())
    }

    pub fn transform(&self) -> SecurityTransform<SessionAuthenticator, RequestMatcherAuthorizer> {
        let session = self.session.clone();
        let authorizer = self.authorizer();
        SecurityTransform::new()
            .config_authenticator(move || SessionAuthenticator::new(session.clone()))
            .config_authorizer(move || authorizer.clone())
            .web_security(web_security())
            .logout(self.logout.clone())
    }

    pub fn csrf_protection(&self) -> CsrfProtection {
        CsrfProtection::new(self.csrf.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ordering_parse() {
        assert_eq!("effective".parse(), Ok(RuleOrdering::Effective));
        assert_eq!(" Declared ".parse(), Ok(RuleOrdering::Declared));
        assert!("first".parse::<RuleOrdering>().is_err());
        assert_eq!(RuleOrdering::default(), RuleOrdering::Effective);
    }

    #[test]
    fn test_declared_table_keeps_source_order() {
        let policy = policy_evaluator(RuleOrdering::Declared);
        let rendered: Vec<String> = policy.rules().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "[/**] -> permitAll",
                "[/v/users] -> hasRole('ADMIN')",
                "[/v, /v/**] -> hasRole('VIEW')",
                "[/swagger-ui.html, /swagger-ui/**] -> hasRole('VIEW')",
                "anyRequest -> authenticated",
            ]
        );
    }

    #[test]
    fn test_access_denied_page() {
        let req = actix_web::test::TestRequest::post().uri("/login").to_http_request();
        let res = WebAccessDeniedHandler.handle(&req, &AuthError::MissingCsrfToken);
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
