//! Session-based authentication state.
//!
//! # Spring Security Equivalent
//! `HttpSessionSecurityContextRepository`, `HttpSessionRequestCache` and
//! `SessionFixationProtectionStrategy`
//!
//! # Example
//! ```rust,ignore
//! use site_security_core::http::security::session::{SessionAuthenticator, SessionConfig};
//! use actix_session::SessionMiddleware;
//! use actix_session::storage::CookieSessionStore;
//!
//! let session_middleware = SessionMiddleware::builder(CookieSessionStore::default(), key)
//!     .cookie_name("JSESSIONID".into())
//!     .build();
//!
//! App::new()
//!     .wrap(SecurityTransform::new()
//!         .config_authenticator(|| SessionAuthenticator::new(SessionConfig::new()))
//!         .config_authorizer(|| authorizer.clone()))
//!     .wrap(session_middleware)
//! ```

use actix_session::{Session, SessionExt};
use actix_web::dev::ServiceRequest;
use derive_more::{Display, Error};
use log::{debug, warn};

use crate::http::security::config::Authenticator;
use crate::http::security::principal::Principal;

pub const DEFAULT_PRINCIPAL_KEY: &str = "security.principal";
pub const DEFAULT_SAVED_REQUEST_KEY: &str = "security.saved_request";

/// Strategy for session fixation protection applied at login.
///
/// # Spring Security Equivalent
/// `sessionManagement().sessionFixation()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFixationStrategy {
    /// New session id, attributes kept.
    #[default]
    MigrateSession,
    /// New session id, attributes dropped.
    NewSession,
    /// Keep the session as is. Only for tests.
    None,
}

/// Where authentication state lives in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    principal_key: String,
    saved_request_key: String,
    fixation_strategy: SessionFixationStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfig {
            principal_key: DEFAULT_PRINCIPAL_KEY.to_string(),
            saved_request_key: DEFAULT_SAVED_REQUEST_KEY.to_string(),
            fixation_strategy: SessionFixationStrategy::default(),
        }
    }

    pub fn principal_key(mut self, key: &str) -> Self {
        self.principal_key = key.to_string();
        self
    }

    pub fn saved_request_key(mut self, key: &str) -> Self {
        self.saved_request_key = key.to_string();
        self
    }

    pub fn fixation_strategy(mut self, strategy: SessionFixationStrategy) -> Self {
        self.fixation_strategy = strategy;
        self
    }

    pub fn get_principal_key(&self) -> &str {
        &self.principal_key
    }

    pub fn get_saved_request_key(&self) -> &str {
        &self.saved_request_key
    }

    pub fn get_fixation_strategy(&self) -> SessionFixationStrategy {
        self.fixation_strategy
    }
}

/// Session-related errors.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[display("Session insert error: {_0}")]
    InsertError(#[error(not(source))] String),
}

/// Reads the principal from the actix-session.
///
/// # Requirements
/// - `SessionMiddleware` must wrap the security middleware
/// - the principal is written by [`SessionAuthenticator::login`]
#[derive(Clone, Debug, Default)]
pub struct SessionAuthenticator {
    config: SessionConfig,
}

impl SessionAuthenticator {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Stores the principal with session fixation protection.
    ///
    /// # Spring Equivalent
    /// `SecurityContextHolder.getContext().setAuthentication(...)` after
    /// `SessionAuthenticationStrategy.onAuthentication(...)`
    pub fn login(session: &Session, principal: &Principal, config: &SessionConfig) -> Result<(), SessionError> {
        match config.fixation_strategy {
            SessionFixationStrategy::MigrateSession => session.renew(),
            SessionFixationStrategy::NewSession => {
                session.purge();
            }
            SessionFixationStrategy::None => {}
        }

        session
            .insert(&config.principal_key, principal)
            .map_err(|e| SessionError::InsertError(e.to_string()))
    }

    /// Removes authentication state but keeps the session.
    pub fn logout(session: &Session, config: &SessionConfig) {
        session.remove(&config.principal_key);
        session.remove(&config.saved_request_key);
    }

    /// Drops the whole session; the session cookie is removed on response.
    ///
    /// # Spring Equivalent
    /// `HttpSession.invalidate()`
    pub fn invalidate(session: &Session) {
        session.purge();
    }

    pub fn get_session_principal(session: &Session, config: &SessionConfig) -> Option<Principal> {
        match session.get::<Principal>(&config.principal_key) {
            Ok(principal) => principal,
            Err(e) => {
                warn!("Discarding unreadable session principal: {}", e);
                session.remove(&config.principal_key);
                None
            }
        }
    }

    /// Remembers the URL that triggered a login challenge.
    ///
    /// # Spring Equivalent
    /// `HttpSessionRequestCache.saveRequest`
    pub fn save_request(session: &Session, url: &str, config: &SessionConfig) -> Result<(), SessionError> {
        debug!("Saving request {} for after login", url);
        session
            .insert(&config.saved_request_key, url)
            .map_err(|e| SessionError::InsertError(e.to_string()))
    }

    /// Returns and forgets the saved URL.
    pub fn take_saved_request(session: &Session, config: &SessionConfig) -> Option<String> {
        let saved = session.get::<String>(&config.saved_request_key).ok().flatten();
        if saved.is_some() {
            session.remove(&config.saved_request_key);
        }
        saved
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Authenticator for SessionAuthenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<Principal> {
        let session = req.get_session();
        Self::get_session_principal(&session, &self.config)
    }
}
