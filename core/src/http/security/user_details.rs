//! Loading site accounts by e-mail.
//!
//! # Spring Security Equivalent
//! `UserDetailsService` / `InMemoryUserDetailsManager`
//!
//! # Example
//! ```rust,ignore
//! use site_security_core::http::security::user_details::{UserAccount, UserDetailsError, UserDetailsService};
//! use async_trait::async_trait;
//!
//! struct DatabaseUserDetailsService {
//!     pool: sqlx::PgPool,
//! }
//!
//! #[async_trait]
//! impl UserDetailsService for DatabaseUserDetailsService {
//!     async fn load_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserDetailsError> {
//!         // SELECT email, password, roles FROM users WHERE email = $1
//!         # unimplemented!()
//!     }
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use derive_more::{Display, Error};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::http::security::principal::Principal;
use crate::http::security::role::Role;

/// Errors that can occur when loading user details.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum UserDetailsError {
    #[display("User not found")]
    NotFound,
    #[display("Account is disabled")]
    AccountDisabled,
    #[display("Storage error: {_0}")]
    StorageError(#[error(not(source))] String),
}

/// A stored account: e-mail, BCrypt hash and granted roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl UserAccount {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        UserAccount {
            email: email.into(),
            password_hash: password_hash.into(),
            roles: BTreeSet::new(),
            enabled: true,
        }
    }

    /// Adds roles (builder pattern).
    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The identity stored in the session once the password checks out.
    pub fn to_principal(&self) -> Principal {
        Principal::new(self.email.clone()).roles(self.roles.iter().copied())
    }
}

/// Async trait for loading accounts from any data source.
///
/// # Spring Security Equivalent
/// `UserDetailsService.loadUserByUsername(String)`
#[async_trait]
pub trait UserDetailsService: Send + Sync {
    /// Returns `Ok(None)` when no account has this e-mail.
    async fn load_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserDetailsError>;

    async fn user_exists(&self, email: &str) -> Result<bool, UserDetailsError> {
        Ok(self.load_user_by_email(email).await?.is_some())
    }
}

/// Immutable in-memory account store.
///
/// # Spring Security Equivalent
/// `InMemoryUserDetailsManager`
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserDetailsService {
    users: Arc<HashMap<String, UserAccount>>,
}

impl InMemoryUserDetailsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account (builder pattern). A later account with the same
    /// e-mail replaces the earlier one.
    pub fn with_user(self, account: UserAccount) -> Self {
        let mut users = Arc::unwrap_or_clone(self.users);
        if let Some(previous) = users.insert(account.email.clone(), account) {
            warn!("Duplicate account for {} replaced", previous.email);
        }
        Self {
            users: Arc::new(users),
        }
    }

    pub fn with_users(self, accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        accounts.into_iter().fold(self, Self::with_user)
    }

    /// Known e-mails, sorted.
    pub fn emails(&self) -> Vec<&str> {
        let mut emails: Vec<&str> = self.users.keys().map(String::as_str).collect();
        emails.sort_unstable();
        emails
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDetailsService for InMemoryUserDetailsService {
    async fn load_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserDetailsError> {
        Ok(self.users.get(email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> InMemoryUserDetailsService {
        InMemoryUserDetailsService::new()
            .with_user(UserAccount::new("admin@site.test", "$2b$04$hash").roles([Role::Admin, Role::View]))
            .with_user(UserAccount::new("viewer@site.test", "$2b$04$hash").roles([Role::View]))
    }

    #[actix_web::test]
    async fn test_load_user() {
        let service = service();
        let account = service.load_user_by_email("admin@site.test").await.unwrap().unwrap();
        assert!(account.roles.contains(&Role::Admin));
        assert!(account.enabled);
        assert!(service.load_user_by_email("nobody@site.test").await.unwrap().is_none());
        assert!(service.user_exists("viewer@site.test").await.unwrap());
    }

    #[test]
    fn test_duplicate_replaces() {
        let service = service().with_user(UserAccount::new("viewer@site.test", "$2b$04$other"));
        assert_eq!(service.len(), 2);
        assert_eq!(service.emails(), vec!["admin@site.test", "viewer@site.test"]);
    }

    #[test]
    fn test_to_principal() {
        let account = UserAccount::new("viewer@site.test", "x").roles([Role::View]);
        let principal = account.to_principal();
        assert_eq!(principal.get_username(), "viewer@site.test");
        assert!(principal.has_role(Role::View));
    }

    #[test]
    fn test_deserialize_defaults() {
        let account: UserAccount =
            serde_json::from_str(r#"{"email":"a@b.c","password_hash":"h"}"#).unwrap();
        assert!(account.enabled);
        assert!(account.roles.is_empty());
    }
}
