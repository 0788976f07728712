//! Form-based Login Authentication.
//!
//! # Spring Security Equivalent
//! `formLogin().loginPage(..).usernameParameter(..).passwordParameter(..)
//!     .defaultSuccessUrl(.., true).failureUrl(..)`
//!
//! # Example
//! ```rust,ignore
//! use site_security_core::http::security::form_login::{FormLoginConfig, FormLoginService};
//!
//! let form_login = FormLoginConfig::new()
//!     .login_page("/login")
//!     .username_parameter("email")
//!     .default_success_url("/v")
//!     .always_use_default_success_url(true)
//!     .failure_url("/login?error=1");
//!
//! async fn login(
//!     session: Session,
//!     form: web::Form<HashMap<String, String>>,
//!     service: web::Data<FormLoginService<DaoAuthenticationProvider>>,
//! ) -> HttpResponse {
//!     service.attempt_authentication(&session, &form).await
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use actix_session::Session;
use actix_web::http::header::LOCATION;
use actix_web::HttpResponse;
use derive_more::{Display, Error};
use log::{info, warn};

use crate::http::security::config::CredentialAuthenticator;
use crate::http::security::csrf::CsrfTokenRepository;
use crate::http::security::principal::Principal;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};

// =============================================================================
// Form Login Configuration
// =============================================================================

/// Form login configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLoginConfig {
    login_page: String,
    login_processing_url: String,
    username_parameter: String,
    password_parameter: String,
    default_success_url: String,
    always_use_default_success_url: bool,
    failure_url: String,
}

impl Default for FormLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FormLoginConfig {
    /// Spring's defaults: `/login`, `username` / `password`, success `/`,
    /// failure `/login?error`.
    pub fn new() -> Self {
        Self {
            login_page: "/login".to_string(),
            login_processing_url: "/login".to_string(),
            username_parameter: "username".to_string(),
            password_parameter: "password".to_string(),
            default_success_url: "/".to_string(),
            always_use_default_success_url: false,
            failure_url: "/login?error".to_string(),
        }
    }

    /// Sets the login page. The processing URL and failure URL follow it,
    /// as in Spring.
    pub fn login_page(mut self, url: &str) -> Self {
        self.login_page = url.to_string();
        self.login_processing_url = url.to_string();
        self.failure_url = format!("{}?error", url);
        self
    }

    pub fn login_processing_url(mut self, url: &str) -> Self {
        self.login_processing_url = url.to_string();
        self
    }

    pub fn username_parameter(mut self, param: &str) -> Self {
        self.username_parameter = param.to_string();
        self
    }

    pub fn password_parameter(mut self, param: &str) -> Self {
        self.password_parameter = param.to_string();
        self
    }

    pub fn default_success_url(mut self, url: &str) -> Self {
        self.default_success_url = url.to_string();
        self
    }

    /// When true, a saved request never overrides the default success URL.
    pub fn always_use_default_success_url(mut self, always: bool) -> Self {
        self.always_use_default_success_url = always;
        self
    }

    pub fn failure_url(mut self, url: &str) -> Self {
        self.failure_url = url.to_string();
        self
    }

    pub fn get_login_page(&self) -> &str {
        &self.login_page
    }

    pub fn get_login_processing_url(&self) -> &str {
        &self.login_processing_url
    }

    pub fn get_username_parameter(&self) -> &str {
        &self.username_parameter
    }

    pub fn get_password_parameter(&self) -> &str {
        &self.password_parameter
    }

    pub fn get_default_success_url(&self) -> &str {
        &self.default_success_url
    }

    pub fn is_always_use_default_success_url(&self) -> bool {
        self.always_use_default_success_url
    }

    pub fn get_failure_url(&self) -> &str {
        &self.failure_url
    }

    /// Pulls the username and password out of submitted form fields.
    /// The username is trimmed.
    pub fn extract_credentials(&self, params: &HashMap<String, String>) -> Result<LoginForm, FormLoginError> {
        let username = params
            .get(&self.username_parameter)
            .ok_or_else(|| FormLoginError::MissingParameter(self.username_parameter.clone()))?;
        let password = params
            .get(&self.password_parameter)
            .ok_or_else(|| FormLoginError::MissingParameter(self.password_parameter.clone()))?;

        Ok(LoginForm {
            username: username.trim().to_string(),
            password: password.clone(),
        })
    }
}

/// Credentials taken from a login form.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[PROTECTED]")
            .finish()
    }
}

// =============================================================================
// Form Login Handler
// =============================================================================

/// Turns an authentication result into the login redirect.
///
/// # Spring Security Equivalent
/// `SavedRequestAwareAuthenticationSuccessHandler` and
/// `SimpleUrlAuthenticationFailureHandler`
#[derive(Clone)]
pub struct FormLoginHandler {
    config: FormLoginConfig,
    session_config: SessionConfig,
    csrf_token_repository: Option<Arc<dyn CsrfTokenRepository>>,
}

impl FormLoginHandler {
    pub fn new(config: FormLoginConfig, session_config: SessionConfig) -> Self {
        Self {
            config,
            session_config,
            csrf_token_repository: None,
        }
    }

    /// Issue a fresh CSRF token on successful login.
    ///
    /// # Spring Equivalent
    /// `CsrfAuthenticationStrategy`
    pub fn csrf_token_repository(mut self, repository: Arc<dyn CsrfTokenRepository>) -> Self {
        self.csrf_token_repository = Some(repository);
        self
    }

    /// Stores the principal in the session and redirects to the saved
    /// request or the default success URL.
    pub fn on_authentication_success(&self, session: &Session, principal: &Principal) -> HttpResponse {
        let saved = SessionAuthenticator::take_saved_request(session, &self.session_config);

        if let Err(e) = SessionAuthenticator::login(session, principal, &self.session_config) {
            warn!("Could not store {} in session: {}", principal.get_username(), e);
            return self.on_authentication_failure();
        }
        info!("Login of {}", principal.get_username());

        let redirect_url = match saved {
            Some(url) if !self.config.always_use_default_success_url => url,
            _ => self.config.default_success_url.clone(),
        };

        let mut response = HttpResponse::Found()
            .insert_header((LOCATION, redirect_url))
            .finish();

        if let Some(repository) = &self.csrf_token_repository {
            let token = repository.generate_token();
            if let Err(e) = repository.save_token(&token, response.headers_mut()) {
                warn!("Could not rotate CSRF token: {}", e);
            }
        }

        response
    }

    pub fn on_authentication_failure(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((LOCATION, self.config.failure_url.clone()))
            .finish()
    }

    pub fn is_login_page(&self, url: &str) -> bool {
        url == self.config.login_page || url.starts_with(&format!("{}?", self.config.login_page))
    }

    pub fn config(&self) -> &FormLoginConfig {
        &self.config
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }
}

// =============================================================================
// Form Login Service
// =============================================================================

/// Credential check plus session handling for the login form post.
///
/// # Spring Security Equivalent
/// `UsernamePasswordAuthenticationFilter`
#[derive(Clone)]
pub struct FormLoginService<A>
where
    A: CredentialAuthenticator,
{
    authenticator: A,
    handler: FormLoginHandler,
}

impl<A> FormLoginService<A>
where
    A: CredentialAuthenticator,
{
    pub fn new(authenticator: A, handler: FormLoginHandler) -> Self {
        Self {
            authenticator,
            handler,
        }
    }

    /// Verifies the submitted form and answers with the login redirect.
    /// Every failure ends on the failure URL.
    pub async fn attempt_authentication(
        &self,
        session: &Session,
        params: &HashMap<String, String>,
    ) -> HttpResponse {
        let form = match self.handler.config.extract_credentials(params) {
            Ok(form) => form,
            Err(e) => {
                warn!("Rejected login form: {}", e);
                return self.handler.on_authentication_failure();
            }
        };

        match self.authenticator.authenticate(&form.username, &form.password).await {
            Ok(principal) => self.handler.on_authentication_success(session, &principal),
            Err(e) => {
                info!("Login failed for {}: {}", form.username, e);
                self.handler.on_authentication_failure()
            }
        }
    }

    pub fn handler(&self) -> &FormLoginHandler {
        &self.handler
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }
}

// =============================================================================
// Form Login Error
// =============================================================================

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum FormLoginError {
    #[display("Missing parameter: {_0}")]
    MissingParameter(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::AuthError;
    use crate::http::security::csrf::CookieCsrfTokenRepository;
    use crate::http::security::role::Role;
    use actix_session::SessionExt;
    use actix_web::http::{header, StatusCode};
    use actix_web::test::TestRequest;
    use async_trait::async_trait;

    struct FixedAuthenticator;

    #[async_trait(?Send)]
    impl CredentialAuthenticator for FixedAuthenticator {
        async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
            if username == "viewer@site.test" && password == "pw" {
                Ok(Principal::new(username).role(Role::View))
            } else {
                Err(AuthError::BadCredentials)
            }
        }
    }

    fn site_config() -> FormLoginConfig {
        FormLoginConfig::new()
            .login_page("/login")
            .username_parameter("email")
            .password_parameter("password")
            .default_success_url("/v")
            .always_use_default_success_url(true)
            .failure_url("/login?error=1")
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn location(response: &HttpResponse) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_defaults_follow_login_page() {
        let config = FormLoginConfig::new().login_page("/signin");
        assert_eq!(config.get_login_processing_url(), "/signin");
        assert_eq!(config.get_failure_url(), "/signin?error");
        assert_eq!(config.get_default_success_url(), "/");
        assert!(!config.is_always_use_default_success_url());
    }

    #[test]
    fn test_extract_credentials() {
        let config = site_config();
        let form = config
            .extract_credentials(&params(&[("email", " viewer@site.test "), ("password", "pw")]))
            .unwrap();
        assert_eq!(form.username, "viewer@site.test");
        assert_eq!(
            config.extract_credentials(&params(&[("email", "x")])),
            Err(FormLoginError::MissingParameter("password".into()))
        );
        assert!(format!("{:?}", form).contains("[PROTECTED]"));
    }

    #[actix_web::test]
    async fn test_success_always_goes_to_default() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let session_config = SessionConfig::new();
        SessionAuthenticator::save_request(&session, "/v/users", &session_config).unwrap();

        let service = FormLoginService::new(
            FixedAuthenticator,
            FormLoginHandler::new(site_config(), session_config.clone()),
        );
        let response = service
            .attempt_authentication(&session, &params(&[("email", "viewer@site.test"), ("password", "pw")]))
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/v");
        assert!(SessionAuthenticator::get_session_principal(&session, &session_config).is_some());
    }

    #[actix_web::test]
    async fn test_success_uses_saved_request_when_allowed() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let session_config = SessionConfig::new();
        SessionAuthenticator::save_request(&session, "/v/users", &session_config).unwrap();

        let handler = FormLoginHandler::new(
            site_config().always_use_default_success_url(false),
            session_config,
        )
        .csrf_token_repository(Arc::new(CookieCsrfTokenRepository::with_http_only_false()));
        let response = handler.on_authentication_success(&session, &Principal::new("viewer@site.test"));

        assert_eq!(location(&response), "/v/users");
        assert!(response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("XSRF-TOKEN="));
    }

    #[actix_web::test]
    async fn test_failures_redirect_to_failure_url() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let service = FormLoginService::new(
            FixedAuthenticator,
            FormLoginHandler::new(site_config(), SessionConfig::new()),
        );

        let wrong = service
            .attempt_authentication(&session, &params(&[("email", "viewer@site.test"), ("password", "no")]))
            .await;
        assert_eq!(location(&wrong), "/login?error=1");

        let missing = service.attempt_authentication(&session, &params(&[])).await;
        assert_eq!(location(&missing), "/login?error=1");
        assert!(SessionAuthenticator::get_session_principal(&session, &SessionConfig::new()).is_none());
    }

    #[test]
    fn test_is_login_page() {
        let handler = FormLoginHandler::new(site_config(), SessionConfig::new());
        assert!(handler.is_login_page("/login"));
        assert!(handler.is_login_page("/login?error=1"));
        assert!(!handler.is_login_page("/loginx"));
    }
}
