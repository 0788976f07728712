//! Authenticated identity.
//!
//! # Spring Equivalent
//! `Authentication.getPrincipal()` after a successful form login

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::security::role::Role;

/// The caller behind a request once login has succeeded.
///
/// Created by the authentication provider, kept in the session, and
/// dropped on logout. The username is the account e-mail.
///
/// # Example
/// ```
/// use site_security_core::http::security::{Principal, Role};
///
/// let principal = Principal::new("ada@example.com").role(Role::View);
///
/// assert!(principal.has_role(Role::View));
/// assert!(!principal.has_role(Role::Admin));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    username: String,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Principal {
            username: username.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Adds one role (builder pattern).
    pub fn role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Adds roles (builder pattern). Duplicates collapse.
    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Checks if the principal has ANY of the given roles (OR logic).
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// `ROLE_`-prefixed authority strings, sorted.
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(Role::authority).collect()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.username, self.authorities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        let principal = Principal::new("admin@site.test").roles([Role::Admin, Role::View, Role::Admin]);
        assert_eq!(principal.get_roles().len(), 2);
        assert!(principal.has_any_role(&[Role::View]));
        assert_eq!(principal.authorities(), vec!["ROLE_ADMIN", "ROLE_VIEW"]);
    }

    #[test]
    fn test_no_roles() {
        let principal = Principal::new("member@site.test");
        assert!(!principal.has_any_role(&Role::ALL));
        assert_eq!(principal.get_username(), "member@site.test");
    }

    #[test]
    fn test_session_round_trip() {
        let principal = Principal::new("viewer@site.test").role(Role::View);
        let json = serde_json::to_string(&principal).unwrap();
        assert_eq!(json, r#"{"username":"viewer@site.test","roles":["VIEW"]}"#);
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, principal);
    }
}
