//! Paths that bypass security entirely.
//!
//! # Spring Security Equivalent
//! `WebSecurity.ignoring().antMatchers(...)`

use crate::http::security::ant_matcher::AntMatchers;

/// Static assets and API docs are served without CSRF checks,
/// authentication or authorization.
///
/// # Example
/// ```
/// use site_security_core::http::security::WebSecurity;
///
/// let web = WebSecurity::new().ignoring(&["/static/**", "/api-docs"]);
/// assert!(web.is_ignored("/static/site.css"));
/// assert!(!web.is_ignored("/v"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct WebSecurity {
    ignoring: AntMatchers,
}

impl WebSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds ignored patterns (builder pattern).
    pub fn ignoring(mut self, patterns: &[&str]) -> Self {
        for pattern in patterns {
            self.ignoring = self.ignoring.add(pattern);
        }
        self
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignoring.matches(path)
    }

    pub fn ignored_patterns(&self) -> &AntMatchers {
        &self.ignoring
    }
}
