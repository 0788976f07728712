//! Credential verification against stored accounts.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.authentication.dao.DaoAuthenticationProvider`

use std::sync::{Arc, OnceLock};

use actix_web::web;
use async_trait::async_trait;
use log::{debug, error};

use crate::http::error::AuthError;
use crate::http::security::config::CredentialAuthenticator;
use crate::http::security::crypto::PasswordEncoder;
use crate::http::security::principal::Principal;
use crate::http::security::user_details::{UserDetailsError, UserDetailsService};

const USER_NOT_FOUND_PASSWORD: &str = "userNotFoundPassword";

/// Loads the account by e-mail and checks the password hash.
///
/// Unknown e-mail and wrong password are both reported as
/// `AuthError::BadCredentials`. A miss still pays for one hash comparison.
///
/// # Example
/// ```ignore
/// use site_security_core::http::security::{AuthenticationManager, BCryptPasswordEncoder};
///
/// let provider = AuthenticationManager::dao_authentication(users, BCryptPasswordEncoder::new());
/// let principal = provider.authenticate("ada@example.com", "secret").await?;
/// ```
#[derive(Clone)]
pub struct DaoAuthenticationProvider {
    user_details: Arc<dyn UserDetailsService>,
    password_encoder: Arc<dyn PasswordEncoder>,
    not_found_hash: Arc<OnceLock<Option<String>>>,
}

impl DaoAuthenticationProvider {
    pub fn new<U, E>(user_details: U, password_encoder: E) -> Self
    where
        U: UserDetailsService + 'static,
        E: PasswordEncoder + 'static,
    {
        Self::from_arcs(Arc::new(user_details), Arc::new(password_encoder))
    }

    pub fn from_arcs(
        user_details: Arc<dyn UserDetailsService>,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        DaoAuthenticationProvider {
            user_details,
            password_encoder,
            not_found_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn password_encoder(&self) -> Arc<dyn PasswordEncoder> {
        Arc::clone(&self.password_encoder)
    }

    fn not_found_hash(&self) -> Option<String> {
        self.not_found_hash
            .get_or_init(|| self.password_encoder.encode(USER_NOT_FOUND_PASSWORD).ok())
            .clone()
    }

    async fn password_matches(&self, raw: &str, encoded: String) -> Result<bool, AuthError> {
        let encoder = Arc::clone(&self.password_encoder);
        let raw = raw.to_string();
        web::block(move || encoder.matches(&raw, &encoded))
            .await
            .map_err(|e| {
                error!("Password check could not run: {}", e);
                AuthError::AuthenticationService
            })
    }
}

#[async_trait(?Send)]
impl CredentialAuthenticator for DaoAuthenticationProvider {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let account = match self.user_details.load_user_by_email(username).await {
            Ok(Some(account)) => account,
            Ok(None) | Err(UserDetailsError::NotFound) => {
                debug!("No account for {}", username);
                if let Some(hash) = self.not_found_hash() {
                    self.password_matches(password, hash).await?;
                }
                return Err(AuthError::BadCredentials);
            }
            Err(UserDetailsError::AccountDisabled) => return Err(AuthError::AccountDisabled),
            Err(UserDetailsError::StorageError(e)) => {
                error!("Loading account {} failed: {}", username, e);
                return Err(AuthError::AuthenticationService);
            }
        };

        if !account.enabled {
            debug!("Account {} is disabled", username);
            return Err(AuthError::AccountDisabled);
        }

        if !self.password_matches(password, account.password_hash.clone()).await? {
            debug!("Bad password for {}", username);
            return Err(AuthError::BadCredentials);
        }

        Ok(account.to_principal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::crypto::BCryptPasswordEncoder;
    use crate::http::security::role::Role;
    use crate::http::security::user_details::{InMemoryUserDetailsService, UserAccount};

    struct FailingStore;

    #[async_trait]
    impl UserDetailsService for FailingStore {
        async fn load_user_by_email(&self, _email: &str) -> Result<Option<UserAccount>, UserDetailsError> {
            Err(UserDetailsError::StorageError("connection refused".into()))
        }
    }

    fn provider() -> DaoAuthenticationProvider {
        let encoder = BCryptPasswordEncoder::with_cost(4);
        let users = InMemoryUserDetailsService::new()
            .with_user(
                UserAccount::new("admin@site.test", encoder.encode("admin-pw").unwrap())
                    .roles([Role::Admin, Role::View]),
            )
            .with_user(UserAccount::new("gone@site.test", encoder.encode("gone-pw").unwrap()).disabled());
        DaoAuthenticationProvider::new(users, encoder)
    }

    #[actix_web::test]
    async fn test_valid_credentials() {
        let principal = provider().authenticate("admin@site.test", "admin-pw").await.unwrap();
        assert_eq!(principal.get_username(), "admin@site.test");
        assert!(principal.has_role(Role::Admin));
    }

    #[actix_web::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let provider = provider();
        assert_eq!(
            provider.authenticate("admin@site.test", "nope").await,
            Err(AuthError::BadCredentials)
        );
        assert_eq!(
            provider.authenticate("nobody@site.test", "admin-pw").await,
            Err(AuthError::BadCredentials)
        );
    }

    #[actix_web::test]
    async fn test_disabled_account() {
        assert_eq!(
            provider().authenticate("gone@site.test", "gone-pw").await,
            Err(AuthError::AccountDisabled)
        );
    }

    #[actix_web::test]
    async fn test_storage_failure() {
        let provider = DaoAuthenticationProvider::new(FailingStore, BCryptPasswordEncoder::with_cost(4));
        assert_eq!(
            provider.authenticate("admin@site.test", "x").await,
            Err(AuthError::AuthenticationService)
        );
    }
}
