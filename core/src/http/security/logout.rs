//! Logout handling.
//!
//! # Spring Security Equivalent
//! `logout().logoutRequestMatcher(new AntPathRequestMatcher("/logout**"))
//!     .invalidateHttpSession(true).deleteCookies("JSESSIONID")`

use std::fmt;
use std::sync::Arc;

use actix_session::Session;
use actix_web::cookie::Cookie;
use actix_web::http::header::{self, HeaderValue};
use actix_web::HttpResponse;
use log::{info, warn};

use crate::http::security::ant_matcher::AntMatcher;
use crate::http::security::csrf::CsrfTokenRepository;
use crate::http::security::principal::Principal;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};

/// Which requests log out, and what logging out does.
///
/// The matcher is checked against the path only, for every HTTP method.
#[derive(Clone)]
pub struct LogoutConfig {
    matcher: AntMatcher,
    invalidate_http_session: bool,
    delete_cookies: Vec<String>,
    logout_success_url: String,
    session_config: SessionConfig,
    csrf_token_repository: Option<Arc<dyn CsrfTokenRepository>>,
}

impl Default for LogoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutConfig {
    /// `/logout`, session invalidated, redirect to `/login?logout`.
    pub fn new() -> Self {
        LogoutConfig {
            matcher: AntMatcher::new("/logout"),
            invalidate_http_session: true,
            delete_cookies: Vec::new(),
            logout_success_url: "/login?logout".to_string(),
            session_config: SessionConfig::new(),
            csrf_token_repository: None,
        }
    }

    pub fn logout_request_matcher(mut self, pattern: &str) -> Self {
        self.matcher = AntMatcher::new(pattern);
        self
    }

    pub fn invalidate_http_session(mut self, invalidate: bool) -> Self {
        self.invalidate_http_session = invalidate;
        self
    }

    /// Cookies expired on the logout response.
    pub fn delete_cookies(mut self, names: &[&str]) -> Self {
        self.delete_cookies.extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn logout_success_url(mut self, url: &str) -> Self {
        self.logout_success_url = url.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Also drop the CSRF token.
    ///
    /// # Spring Equivalent
    /// `CsrfLogoutHandler`
    pub fn csrf_token_repository(mut self, repository: Arc<dyn CsrfTokenRepository>) -> Self {
        self.csrf_token_repository = Some(repository);
        self
    }

    pub fn is_logout_request(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    pub fn get_logout_success_url(&self) -> &str {
        &self.logout_success_url
    }

    pub fn get_delete_cookies(&self) -> &[String] {
        &self.delete_cookies
    }
}

impl fmt::Debug for LogoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutConfig")
            .field("matcher", &self.matcher.pattern())
            .field("invalidate_http_session", &self.invalidate_http_session)
            .field("delete_cookies", &self.delete_cookies)
            .field("logout_success_url", &self.logout_success_url)
            .finish()
    }
}

/// Performs the logout described by a [`LogoutConfig`].
///
/// # Spring Security Equivalent
/// `LogoutFilter` with `SecurityContextLogoutHandler`,
/// `CookieClearingLogoutHandler` and `SimpleUrlLogoutSuccessHandler`
#[derive(Clone, Debug)]
pub struct LogoutHandler {
    config: LogoutConfig,
}

impl LogoutHandler {
    pub fn new(config: LogoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LogoutConfig {
        &self.config
    }

    /// Clears the authentication and answers with the success redirect.
    pub fn logout(&self, session: &Session, principal: Option<&Principal>) -> HttpResponse {
        match principal {
            Some(principal) => info!("Logout of {}", principal.get_username()),
            None => info!("Logout without an authenticated session"),
        }

        if self.config.invalidate_http_session {
            SessionAuthenticator::invalidate(session);
        } else {
            SessionAuthenticator::logout(session, &self.config.session_config);
        }

        let mut response = HttpResponse::Found()
            .insert_header((header::LOCATION, self.config.logout_success_url.clone()))
            .finish();

        for name in &self.config.delete_cookies {
            let mut cookie = Cookie::new(name.clone(), "");
            cookie.set_path("/");
            cookie.make_removal();
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => warn!("Could not expire cookie {}: {}", name, e),
            }
        }

        if let Some(repository) = &self.config.csrf_token_repository {
            if let Err(e) = repository.clear_token(response.headers_mut()) {
                warn!("Could not clear CSRF token: {}", e);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::csrf::CookieCsrfTokenRepository;
    use crate::http::security::role::Role;
    use actix_session::SessionExt;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    fn set_cookies(response: &HttpResponse) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_matcher_covers_suffixes() {
        let config = LogoutConfig::new().logout_request_matcher("/logout**");
        assert!(config.is_logout_request("/logout"));
        assert!(config.is_logout_request("/logoutAll"));
        assert!(!config.is_logout_request("/v/logout"));
        assert!(!LogoutConfig::new().is_logout_request("/logoutAll"));
    }

    #[test]
    fn test_logout_invalidates_and_redirects() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let config = SessionConfig::new();
        let principal = Principal::new("viewer@site.test").role(Role::View);
        SessionAuthenticator::login(&session, &principal, &config).unwrap();

        let handler = LogoutHandler::new(
            LogoutConfig::new()
                .delete_cookies(&["JSESSIONID"])
                .csrf_token_repository(Arc::new(CookieCsrfTokenRepository::with_http_only_false())),
        );
        let response = handler.logout(&session, Some(&principal));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?logout"
        );
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("JSESSIONID=;") && c.contains("Max-Age=0")));
        assert!(cookies.iter().any(|c| c.starts_with("XSRF-TOKEN=;")));
        assert!(SessionAuthenticator::get_session_principal(&session, &config).is_none());
    }

    #[test]
    fn test_logout_without_invalidation_keeps_other_attributes() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        session.insert("theme", "dark").unwrap();
        SessionAuthenticator::login(&session, &Principal::new("a@site.test"), &SessionConfig::new()).unwrap();

        let handler = LogoutHandler::new(
            LogoutConfig::new()
                .invalidate_http_session(false)
                .logout_success_url("/"),
        );
        let response = handler.logout(&session, None);

        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(set_cookies(&response).is_empty());
        assert_eq!(session.get::<String>("theme").unwrap().as_deref(), Some("dark"));
        assert!(SessionAuthenticator::get_session_principal(&session, &SessionConfig::new()).is_none());
    }
}
