//! URL-pattern based authorization.
//!
//! [`PolicyEvaluator`] is the pure decision function: an ordered rule table
//! plus the ignored paths. [`RequestMatcherAuthorizer`] acts on its answer
//! inside the middleware.
//!
//! # Spring Security Equivalent
//! `authorizeRequests().antMatchers(...).hasRole(...)` with
//! `ExceptionTranslationFilter` acting on the outcome

use std::fmt;
use std::sync::Arc;

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::{header, Method};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use log::{debug, warn};

use crate::http::error::AuthError;
use crate::http::security::access_denied::{AccessDeniedHandler, DefaultAccessDeniedHandler};
use crate::http::security::ant_matcher::AntMatchers;
use crate::http::security::config::Authorizer;
use crate::http::security::principal::Principal;
use crate::http::security::request::matching_path;
use crate::http::security::role::Role;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};
use crate::http::security::web::WebSecurity;

/// Outcome of evaluating a request against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Serve the request.
    Allow,
    /// Authenticated but not permitted: 403.
    Deny,
    /// Not authenticated: redirect to the login page.
    Challenge,
}

/// Access requirement attached to a rule.
///
/// # Spring Security Equivalent
/// `permitAll()`, `denyAll()`, `authenticated()`, `hasRole(..)`, `hasAnyRole(..)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    PermitAll,
    DenyAll,
    Authenticated,
    HasRole(Role),
    HasAnyRole(Vec<Role>),
}

impl Access {
    /// Applies the requirement to a caller. Anonymous callers that fail a
    /// requirement are challenged; authenticated ones are denied.
    pub fn decide(&self, principal: Option<&Principal>) -> AccessDecision {
        let granted = match self {
            Access::PermitAll => return AccessDecision::Allow,
            Access::DenyAll => false,
            Access::Authenticated => principal.is_some(),
            Access::HasRole(role) => principal.is_some_and(|p| p.has_role(*role)),
            Access::HasAnyRole(roles) => principal.is_some_and(|p| p.has_any_role(roles)),
        };

        match (granted, principal) {
            (true, _) => AccessDecision::Allow,
            (false, Some(_)) => AccessDecision::Deny,
            (false, None) => AccessDecision::Challenge,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::PermitAll => f.write_str("permitAll"),
            Access::DenyAll => f.write_str("denyAll"),
            Access::Authenticated => f.write_str("authenticated"),
            Access::HasRole(role) => write!(f, "hasRole('{}')", role),
            Access::HasAnyRole(roles) => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                write!(f, "hasAnyRole('{}')", names.join("','"))
            }
        }
    }
}

/// Which requests a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMatcher {
    Ant(AntMatchers),
    AnyRequest,
}

impl RequestMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RequestMatcher::Ant(matchers) => matchers.matches(path),
            RequestMatcher::AnyRequest => true,
        }
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMatcher::Ant(matchers) => fmt::Display::fmt(matchers, f),
            RequestMatcher::AnyRequest => f.write_str("anyRequest"),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub matcher: RequestMatcher,
    pub access: Access,
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.matcher, self.access)
    }
}

/// Ordered rule table. The first rule whose matcher accepts the path
/// decides; later rules are never consulted.
///
/// Ignored paths are allowed before the table is looked at. A path no rule
/// matches is allowed.
///
/// # Example
/// ```
/// use site_security_core::http::security::{Access, AccessDecision, PolicyEvaluator, Principal, Role};
///
/// let policy = PolicyEvaluator::new()
///     .add_rule(&["/v/users"], Access::HasRole(Role::Admin))
///     .add_rule(&["/v", "/v/**"], Access::HasRole(Role::View))
///     .any_request(Access::Authenticated);
///
/// let viewer = Principal::new("viewer@example.com").role(Role::View);
/// assert_eq!(policy.evaluate("/v/users", Some(&viewer)), AccessDecision::Deny);
/// assert_eq!(policy.evaluate("/v/users", None), AccessDecision::Challenge);
/// assert_eq!(policy.evaluate("/v", Some(&viewer)), AccessDecision::Allow);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    web: WebSecurity,
    rules: Vec<AccessRule>,
}

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths answered with `Allow` before any rule.
    pub fn web_security(mut self, web: WebSecurity) -> Self {
        self.web = web;
        self
    }

    /// Appends a rule for the given Ant patterns.
    pub fn add_rule(mut self, patterns: &[&str], access: Access) -> Self {
        self.rules.push(AccessRule {
            matcher: RequestMatcher::Ant(AntMatchers::from_patterns(patterns)),
            access,
        });
        self
    }

    /// Appends a catch-all rule.
    ///
    /// # Spring Equivalent
    /// `anyRequest()`
    pub fn any_request(mut self, access: Access) -> Self {
        self.rules.push(AccessRule {
            matcher: RequestMatcher::AnyRequest,
            access,
        });
        self
    }

    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> AccessDecision {
        if self.web.is_ignored(path) {
            return AccessDecision::Allow;
        }
        match self.matching_rule(path) {
            Some(rule) => rule.access.decide(principal),
            None => AccessDecision::Allow,
        }
    }

    /// The rule that decides `path`, if any.
    pub fn matching_rule(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(path))
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn get_web_security(&self) -> &WebSecurity {
        &self.web
    }
}

/// Executes [`PolicyEvaluator`] decisions in the middleware chain.
///
/// - `Allow` forwards to the inner service.
/// - `Challenge` saves the URL of a `GET` request in the session and
///   redirects to the login page.
/// - `Deny` is rendered by the access-denied handler.
#[derive(Clone)]
pub struct RequestMatcherAuthorizer {
    policy: Arc<PolicyEvaluator>,
    login_url: String,
    access_denied_handler: Arc<dyn AccessDeniedHandler>,
    request_cache: Option<SessionConfig>,
}

impl RequestMatcherAuthorizer {
    pub fn new(policy: PolicyEvaluator) -> Self {
        Self::from_arc(Arc::new(policy))
    }

    pub fn from_arc(policy: Arc<PolicyEvaluator>) -> Self {
        RequestMatcherAuthorizer {
            policy,
            login_url: "/login".to_string(),
            access_denied_handler: Arc::new(DefaultAccessDeniedHandler),
            request_cache: None,
        }
    }

    /// Sets the login URL (default: "/login").
    pub fn login_url(mut self, url: &str) -> Self {
        self.login_url = url.to_string();
        self
    }

    /// # Spring Security Equivalent
    /// `exceptionHandling().accessDeniedHandler(...)`
    pub fn access_denied_handler<H: AccessDeniedHandler + 'static>(mut self, handler: H) -> Self {
        self.access_denied_handler = Arc::new(handler);
        self
    }

    pub fn shared_access_denied_handler(mut self, handler: Arc<dyn AccessDeniedHandler>) -> Self {
        self.access_denied_handler = handler;
        self
    }

    /// Saves challenged requests in the session for the login success redirect.
    pub fn save_requests(mut self, config: SessionConfig) -> Self {
        self.request_cache = Some(config);
        self
    }

    pub fn policy(&self) -> &PolicyEvaluator {
        &self.policy
    }

    fn save_request(&self, req: &ServiceRequest) {
        let Some(config) = &self.request_cache else {
            return;
        };
        if req.method() != Method::GET {
            return;
        }
        let url = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.path().to_string(), |pq| pq.as_str().to_string());
        if let Err(e) = SessionAuthenticator::save_request(&req.get_session(), &url, config) {
            warn!("Could not save request {}: {}", url, e);
        }
    }
}

impl<B: 'static> Authorizer<B> for RequestMatcherAuthorizer {
    fn process(
        &self,
        req: ServiceRequest,
        principal: Option<&Principal>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
        let path = matching_path(req.request()).to_string();
        let decision = self.policy.evaluate(&path, principal);
        debug!("{} {} -> {:?}", req.method(), path, decision);

        match decision {
            AccessDecision::Allow => Box::pin(async move {
                let res = next(req).await?;
                Ok(res.map_into_left_body())
            }),
            AccessDecision::Challenge => {
                self.save_request(&req);
                let location = self.login_url.clone();
                Box::pin(async move {
                    Ok(req.into_response(
                        HttpResponse::Found()
                            .append_header((header::LOCATION, location))
                            .finish()
                            .map_into_right_body(),
                    ))
                })
            }
            AccessDecision::Deny => {
                warn!(
                    "Access denied to {} for {}",
                    path,
                    principal.map_or("anonymous", Principal::get_username)
                );
                let res = self
                    .access_denied_handler
                    .handle(req.request(), &AuthError::Forbidden);
                Box::pin(async move { Ok(req.into_response(res.map_into_right_body())) })
            }
        }
    }
}
